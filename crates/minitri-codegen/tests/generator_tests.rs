//! Code generator tests: emission shapes, scope and slot behavior, typing
//! rules, and the semantic error conditions.

use minitri_bytecode::{BlockId, Constant, Instruction, Module, Opcode, Operand};
use minitri_codegen::{generate, CodegenError};

/// Compile source down to an unserialized module.
fn compile(source: &str) -> Module {
    let tokens = minitri_lexer::scan(source).expect("scan failed");
    let program = minitri_parser::parse(&tokens, 0).expect("parse failed");
    generate(&program).expect("codegen failed")
}

/// Compile source expecting a generation failure.
fn compile_err(source: &str) -> CodegenError {
    let tokens = minitri_lexer::scan(source).expect("scan failed");
    let program = minitri_parser::parse(&tokens, 0).expect("parse failed");
    generate(&program).expect_err("expected codegen error")
}

fn entry_instructions(module: &Module) -> &[Instruction] {
    &module
        .program
        .block(BlockId::new(0))
        .expect("entry block missing")
        .instructions
}

// =============================================================================
// Expression emission
// =============================================================================

#[test]
fn precedence_orders_the_instruction_stream() {
    // 2 + 3 * 4: the multiplication is evaluated before the addition.
    let module = compile("let var x: Integer in x := 2 + 3 * 4");
    assert_eq!(
        entry_instructions(&module),
        &[
            Instruction::new(Opcode::LoadConst, Operand::Const(0)),
            Instruction::new(Opcode::LoadConst, Operand::Const(1)),
            Instruction::new(Opcode::LoadConst, Operand::Const(2)),
            Instruction::simple(Opcode::Mul),
            Instruction::simple(Opcode::Add),
            Instruction::new(Opcode::StoreLocal, Operand::Slot(0)),
            Instruction::simple(Opcode::Halt),
        ]
    );
    // Pool in first-use order: 2, 3, 4.
    assert_eq!(module.pool.get(0), Some(&Constant::Int(2)));
    assert_eq!(module.pool.get(1), Some(&Constant::Int(3)));
    assert_eq!(module.pool.get(2), Some(&Constant::Int(4)));
}

#[test]
fn integer_literals_deduplicate_in_the_pool() {
    let module = compile("let var x: Integer in begin x := 5; x := 5 + 5 end");
    assert_eq!(module.pool.len(), 1);
    assert_eq!(module.pool.get(0), Some(&Constant::Int(5)));
}

#[test]
fn unary_minus_emits_neg() {
    let module = compile("let var x: Integer in x := -x");
    let instructions = entry_instructions(&module);
    assert!(instructions.contains(&Instruction::simple(Opcode::Neg)));
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn if_emits_both_jumps() {
    let module = compile(
        "let var x: Integer in \
         if x > 0 then x := 1 else x := 2",
    );
    let instructions = entry_instructions(&module);
    let jump_if_false = instructions
        .iter()
        .filter(|i| i.op == Opcode::JumpIfFalse)
        .count();
    let jumps = instructions.iter().filter(|i| i.op == Opcode::Jump).count();
    assert_eq!(jump_if_false, 1);
    assert_eq!(jumps, 1);
}

#[test]
fn while_loops_jump_backwards_after_the_body() {
    let module = compile(
        "let var x: Integer in \
         begin x := 5; while x > 0 do x := x - 1 end",
    );
    let instructions = entry_instructions(&module);
    assert!(instructions.iter().any(|i| i.op == Opcode::JumpIfFalse));
    assert!(instructions.iter().any(|i| i.op == Opcode::Jump));
}

#[test]
fn condition_types_are_checked() {
    let err = compile_err("let var x: Integer in if x then x := 1 else x := 2");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));

    let err = compile_err("let var x: Integer in while 1 do x := 0");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

// =============================================================================
// Scopes and slots
// =============================================================================

#[test]
fn sibling_let_scopes_reuse_slot_indices() {
    let module = compile(
        "let var a: Integer in \
         begin \
           let var y: Integer in y := 1; \
           let var y: Integer in y := 2 \
         end",
    );
    let stores: Vec<_> = entry_instructions(&module)
        .iter()
        .filter(|i| i.op == Opcode::StoreLocal)
        .collect();
    // Both `y`s land in the same slot, above `a`.
    assert_eq!(stores.len(), 2);
    assert_eq!(stores[0].operand, Operand::Slot(1));
    assert_eq!(stores[1].operand, Operand::Slot(1));
    // The frame high-water mark counts `a` plus one `y` at a time.
    let entry = module.program.block(BlockId::new(0)).unwrap();
    assert_eq!(entry.local_slot_count, 2);
}

#[test]
fn inner_scopes_may_shadow_outer_names() {
    compile("let var x: Integer in let var x: Integer in x := 1");
}

#[test]
fn redeclaration_in_the_same_scope_fails() {
    let err = compile_err("let var x: Integer; var x: Integer in x := 1");
    assert!(matches!(err, CodegenError::DuplicateName { .. }));
}

#[test]
fn undeclared_names_fail() {
    let err = compile_err("x := 1");
    assert!(matches!(err, CodegenError::UndeclaredName { .. }));
}

#[test]
fn names_are_not_visible_after_their_scope_ends() {
    let err = compile_err(
        "let var a: Integer in \
         begin \
           let var y: Integer in y := 1; \
           y := 2 \
         end",
    );
    assert!(matches!(err, CodegenError::UndeclaredName { name, .. } if name == "y"));
}

#[test]
fn unknown_type_denoters_fail() {
    let err = compile_err("let var x: Flubber in x := 1");
    assert!(matches!(err, CodegenError::UndeclaredName { name, .. } if name == "Flubber"));
}

// =============================================================================
// Constants
// =============================================================================

#[test]
fn assigning_to_a_constant_fails() {
    let err = compile_err("let const x ~ 5 in x := x + 1");
    let CodegenError::TypeMismatch { message, .. } = err else {
        panic!("expected immutability error, got {:?}", err);
    };
    assert!(message.contains("constant"));
}

#[test]
fn constants_are_initialized_at_elaboration() {
    let module = compile("let const k ~ 40 + 2; var x: Integer in x := k");
    let instructions = entry_instructions(&module);
    // The initializer is evaluated and stored before the body runs.
    assert_eq!(instructions[0], Instruction::new(Opcode::LoadConst, Operand::Const(0)));
    assert!(instructions.contains(&Instruction::new(Opcode::StoreLocal, Operand::Slot(0))));
}

#[test]
fn const_initializers_cannot_forward_reference() {
    let err = compile_err("let const a ~ b; const b ~ 1 in putint(a)");
    assert!(matches!(err, CodegenError::UndeclaredName { name, .. } if name == "b"));
}

// =============================================================================
// Typing
// =============================================================================

#[test]
fn assignment_types_must_match() {
    let err = compile_err("let var x: Integer in x := 1 < 2");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

#[test]
fn arithmetic_requires_integers() {
    let err = compile_err("let var x: Integer in x := (1 < 2) + 1");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

#[test]
fn equality_requires_matching_operand_types() {
    compile("let var b: Boolean in b := (1 < 2) = (3 < 4)");
    let err = compile_err("let var b: Boolean in b := (1 < 2) = 3");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

// =============================================================================
// Procedures and functions
// =============================================================================

#[test]
fn function_calls_check_arity() {
    let err = compile_err(
        "let func double(n: Integer): Integer return n * 2 \
         in putint(double(1, 2))",
    );
    let CodegenError::ArityMismatch {
        expected, found, ..
    } = err
    else {
        panic!("expected arity error, got {:?}", err);
    };
    assert_eq!(expected, 1);
    assert_eq!(found, 2);
}

#[test]
fn function_calls_check_argument_types() {
    let err = compile_err(
        "let func double(n: Integer): Integer return n * 2 \
         in putint(double(1 < 2))",
    );
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

#[test]
fn recursive_functions_resolve_their_own_name() {
    let module = compile(
        "let var x: Integer; \
             func fact(n: Integer): Integer \
               begin \
                 if n < 2 then return 1 \
                 else return n * fact(n - 1) \
               end \
         in \
         begin \
           x := 5; \
           putint(fact(x)) \
         end",
    );

    // One entry block plus one function block.
    assert_eq!(module.program.len(), 2);

    // The pool holds the function's code object with its arity.
    let code_index = (0..module.pool.len() as u16)
        .find(|&i| matches!(module.pool.get(i), Some(Constant::Code(_))))
        .expect("no code constant in pool");
    let Some(Constant::Code(code)) = module.pool.get(code_index) else {
        unreachable!();
    };
    assert_eq!(code.arity, 1);
    assert_eq!(code.block, BlockId::new(1));

    // The recursive call inside the function body targets the same pool
    // entry that describes the function itself.
    let func = module.program.block(BlockId::new(1)).unwrap();
    assert!(func.instructions.contains(&Instruction::new(
        Opcode::Call,
        Operand::Code {
            pool: code_index,
            arity: 1,
        },
    )));
}

#[test]
fn function_bodies_load_globals_with_global_opcodes() {
    let module = compile(
        "let var g: Integer; \
             func get(): Integer return g \
         in begin g := 7; putint(get()) end",
    );
    let func = module.program.block(BlockId::new(1)).unwrap();
    assert!(func
        .instructions
        .contains(&Instruction::new(Opcode::LoadGlobal, Operand::Slot(0))));
    // Entry code addresses the same storage as a local of the module frame.
    assert!(entry_instructions(&module)
        .contains(&Instruction::new(Opcode::StoreLocal, Operand::Slot(0))));
}

#[test]
fn command_position_calls_discard_the_result() {
    let module = compile(
        "let func one(): Integer return 1 \
         in one()",
    );
    let instructions = entry_instructions(&module);
    let call_at = instructions
        .iter()
        .position(|i| i.op == Opcode::Call)
        .expect("no call emitted");
    assert_eq!(instructions[call_at + 1].op, Opcode::Pop);
}

#[test]
fn return_is_rejected_outside_function_bodies() {
    let err = compile_err("let var x: Integer in return x");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));

    let err = compile_err("let proc p(n: Integer) return n in p(1)");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

#[test]
fn return_type_must_match_the_declaration() {
    let err = compile_err(
        "let func flag(): Boolean return 1 \
         in putint(0)",
    );
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

#[test]
fn procedures_have_no_value_in_expressions() {
    let err = compile_err(
        "let proc p(n: Integer) putint(n); var x: Integer \
         in x := p(1)",
    );
    let CodegenError::TypeMismatch { message, .. } = err else {
        panic!("expected type error");
    };
    assert!(message.contains("does not return a value"));
}

#[test]
fn enclosing_function_locals_are_not_capturable() {
    let err = compile_err(
        "let func outer(a: Integer): Integer \
           let func inner(): Integer return a \
           in return inner() \
         in putint(outer(1))",
    );
    assert!(matches!(err, CodegenError::UndeclaredName { name, .. } if name == "a"));
}

#[test]
fn duplicate_parameter_names_fail() {
    let err = compile_err(
        "let func add(n: Integer, n: Integer): Integer return n \
         in putint(add(1, 2))",
    );
    assert!(matches!(err, CodegenError::DuplicateName { .. }));
}

// =============================================================================
// Builtins
// =============================================================================

#[test]
fn putint_prints_an_integer() {
    let module = compile("putint(42)");
    assert_eq!(
        entry_instructions(&module),
        &[
            Instruction::new(Opcode::LoadConst, Operand::Const(0)),
            Instruction::simple(Opcode::Print),
            Instruction::simple(Opcode::Halt),
        ]
    );
}

#[test]
fn putint_rejects_boolean_arguments() {
    let err = compile_err("putint(1 < 2)");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

#[test]
fn getint_reads_into_a_variable() {
    let module = compile("let var x: Integer in getint(x)");
    assert_eq!(
        entry_instructions(&module),
        &[
            Instruction::simple(Opcode::Read),
            Instruction::new(Opcode::StoreLocal, Operand::Slot(0)),
            Instruction::simple(Opcode::Halt),
        ]
    );
}

#[test]
fn getint_requires_a_variable_argument() {
    let err = compile_err("getint(5)");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));

    let err = compile_err("let const k ~ 1 in getint(k)");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

#[test]
fn builtins_check_arity() {
    let err = compile_err("putint(1, 2)");
    assert!(matches!(err, CodegenError::ArityMismatch { .. }));
}

#[test]
fn builtins_cannot_appear_in_expressions() {
    let err = compile_err("let var x: Integer in x := putint(1)");
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

// =============================================================================
// Label resolution totality
// =============================================================================

#[test]
fn every_emitted_jump_lands_inside_the_code_stream() {
    let module = compile(
        "let var x: Integer; var fact: Integer in \
         begin \
           x := 5; \
           fact := 1; \
           while x > 0 do \
             begin \
               fact := fact * x; \
               x := x - 1 \
             end; \
           if fact > 100 then putint(fact) else putint(0) \
         end",
    );
    let bytes = minitri_bytecode::emit(&module).expect("emit failed");

    // Locate the code section: header is 12 bytes, then the pool.
    let mut cursor = 12;
    let pool_count = u16::from_le_bytes([bytes[cursor], bytes[cursor + 1]]);
    cursor += 2;
    for _ in 0..pool_count {
        match bytes[cursor] {
            0x01 => cursor += 1 + 8,
            0x02 => {
                let len = u16::from_le_bytes([bytes[cursor + 1], bytes[cursor + 2]]) as usize;
                cursor += 3 + len;
            }
            0x03 => cursor += 1 + 4 + 1 + 2,
            tag => panic!("unknown constant tag {:#x}", tag),
        }
    }
    let code_len =
        u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
    cursor += 4;
    let code = &bytes[cursor..cursor + code_len];

    let mut offset = 0usize;
    while offset < code.len() {
        let op = Opcode::from_byte(code[offset]).expect("unknown opcode in stream");
        if matches!(op, Opcode::Jump | Opcode::JumpIfFalse) {
            let disp = i16::from_le_bytes([code[offset + 1], code[offset + 2]]) as i64;
            let target = offset as i64 + disp;
            assert!(
                (0..=code.len() as i64).contains(&target),
                "jump at {} lands at {} outside the stream",
                offset,
                target
            );
        }
        offset += op.encoded_size();
    }
    assert_eq!(offset, code.len());
}
