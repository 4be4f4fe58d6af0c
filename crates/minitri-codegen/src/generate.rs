//! The AST-walking code generator.
//!
//! One depth-first traversal. Commands must leave the operand stack exactly
//! as they found it; expressions must leave exactly one value. Both
//! invariants are checked after every node from the opcodes' declared stack
//! effects, and a violation aborts with an internal-consistency error.

use minitri_ast::{
    BinaryOp, Command, CommandKind, Declaration, DeclarationKind, Expr, ExprKind, Name, Param,
    Program, Span, Type, TypeDenoter, UnaryOp,
};
use minitri_bytecode::{
    BlockId, BytecodeProgram, CodeBlock, CodeRef, ConstantPool, Instruction, LabelId, Module,
    Opcode, Operand,
};

use crate::error::CodegenError;
use crate::symbol::{Builtin, RoutineInfo, SymbolKind, SymbolTable};

/// Generate a module from a parsed program.
pub fn generate(program: &Program) -> Result<Module, CodegenError> {
    Generator::new().run(program)
}

/// Kind of code object currently being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoutineKind {
    /// Module-level entry code.
    Entry,
    /// A `proc` body: no result.
    Proc,
    /// A `func` body with its declared result type.
    Func(Type),
}

/// An instruction buffer under construction, with its running stack depth.
struct BlockCtx {
    id: BlockId,
    block: CodeBlock,
    depth: i32,
}

impl BlockCtx {
    fn new(id: BlockId, arity: u8) -> Self {
        Self {
            id,
            block: CodeBlock::new(arity),
            depth: 0,
        }
    }

    fn emit(&mut self, instr: Instruction) {
        self.depth += instr.stack_effect();
        self.block.instructions.push(instr);
    }

    fn emit_simple(&mut self, op: Opcode) {
        self.emit(Instruction::simple(op));
    }
}

struct Generator {
    program: BytecodeProgram,
    pool: ConstantPool,
    symbols: SymbolTable,
    routine: RoutineKind,
}

impl Generator {
    fn new() -> Self {
        Self {
            program: BytecodeProgram::new(),
            pool: ConstantPool::new(),
            symbols: SymbolTable::new(),
            routine: RoutineKind::Entry,
        }
    }

    fn run(mut self, program: &Program) -> Result<Module, CodegenError> {
        let entry_id = self.program.reserve_block();
        let mut ctx = BlockCtx::new(entry_id, 0);

        self.gen_command(&mut ctx, &program.body)?;
        ctx.emit_simple(Opcode::Halt);

        ctx.block.local_slot_count = self.symbols.frame_high_water(0);
        let block = finish_block(ctx)?;
        self.program.fill_block(entry_id, block);

        Ok(Module {
            program: self.program,
            pool: self.pool,
        })
    }

    // === Commands ===

    /// Generate one command, checking its net stack effect is zero.
    fn gen_command(&mut self, ctx: &mut BlockCtx, command: &Command) -> Result<(), CodegenError> {
        let depth_before = ctx.depth;
        self.gen_command_kind(ctx, command)?;
        if ctx.depth != depth_before {
            return Err(CodegenError::internal(format!(
                "command left net stack effect {} (expected 0)",
                ctx.depth - depth_before
            )));
        }
        Ok(())
    }

    fn gen_command_kind(
        &mut self,
        ctx: &mut BlockCtx,
        command: &Command,
    ) -> Result<(), CodegenError> {
        match &command.kind {
            CommandKind::Assign { target, value } => self.gen_assign(ctx, target, value),
            CommandKind::Call { name, args } => self.gen_call_command(ctx, name, args, command.span),
            CommandKind::Sequence(commands) => {
                for command in commands {
                    self.gen_command(ctx, command)?;
                }
                Ok(())
            }
            CommandKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.gen_if(ctx, cond, then_branch, else_branch),
            CommandKind::While { cond, body } => self.gen_while(ctx, cond, body),
            CommandKind::Let { decls, body } => self.gen_let(ctx, decls, body),
            CommandKind::Block(body) => self.gen_command(ctx, body),
            CommandKind::Return(value) => self.gen_return(ctx, value, command.span),
        }
    }

    fn gen_assign(
        &mut self,
        ctx: &mut BlockCtx,
        target: &Name,
        value: &Expr,
    ) -> Result<(), CodegenError> {
        let (slot, ty, frame) = self.resolve_assignable(target)?;
        let value_ty = self.gen_expr(ctx, value)?;
        if value_ty != ty {
            return Err(CodegenError::type_mismatch(
                format!(
                    "cannot assign {} to {} variable `{}`",
                    value_ty, ty, target.text
                ),
                value.span,
            ));
        }
        ctx.emit(Instruction::new(
            self.store_op(frame),
            Operand::Slot(slot),
        ));
        Ok(())
    }

    fn gen_call_command(
        &mut self,
        ctx: &mut BlockCtx,
        name: &Name,
        args: &[Expr],
        span: Span,
    ) -> Result<(), CodegenError> {
        let symbol = self
            .symbols
            .resolve(&name.text)
            .ok_or_else(|| undeclared(name))?;
        match &symbol.kind {
            SymbolKind::Builtin(builtin) => {
                let builtin = *builtin;
                self.gen_builtin(ctx, builtin, name, args, span)
            }
            SymbolKind::Routine(info) => {
                let info = info.clone();
                self.gen_call(ctx, name, &info, args, span)?;
                // Command position: the uniform call protocol pushed one
                // result; discard it.
                ctx.emit_simple(Opcode::Pop);
                Ok(())
            }
            _ => Err(CodegenError::type_mismatch(
                format!("`{}` is not a procedure or function", name.text),
                name.span,
            )),
        }
    }

    fn gen_if(
        &mut self,
        ctx: &mut BlockCtx,
        cond: &Expr,
        then_branch: &Command,
        else_branch: &Command,
    ) -> Result<(), CodegenError> {
        let cond_ty = self.gen_expr(ctx, cond)?;
        if cond_ty != Type::Boolean {
            return Err(CodegenError::type_mismatch(
                format!("`if` condition must be Boolean, found {}", cond_ty),
                cond.span,
            ));
        }

        let else_label = ctx.block.new_label();
        let end_label = ctx.block.new_label();

        ctx.emit(Instruction::new(
            Opcode::JumpIfFalse,
            Operand::Label(else_label),
        ));
        self.gen_command(ctx, then_branch)?;
        ctx.emit(Instruction::new(Opcode::Jump, Operand::Label(end_label)));
        bind_label(ctx, else_label)?;
        self.gen_command(ctx, else_branch)?;
        bind_label(ctx, end_label)?;
        Ok(())
    }

    fn gen_while(
        &mut self,
        ctx: &mut BlockCtx,
        cond: &Expr,
        body: &Command,
    ) -> Result<(), CodegenError> {
        let top_label = ctx.block.new_label();
        let exit_label = ctx.block.new_label();

        bind_label(ctx, top_label)?;
        let cond_ty = self.gen_expr(ctx, cond)?;
        if cond_ty != Type::Boolean {
            return Err(CodegenError::type_mismatch(
                format!("`while` condition must be Boolean, found {}", cond_ty),
                cond.span,
            ));
        }
        ctx.emit(Instruction::new(
            Opcode::JumpIfFalse,
            Operand::Label(exit_label),
        ));
        self.gen_command(ctx, body)?;
        ctx.emit(Instruction::new(Opcode::Jump, Operand::Label(top_label)));
        bind_label(ctx, exit_label)?;
        Ok(())
    }

    fn gen_let(
        &mut self,
        ctx: &mut BlockCtx,
        decls: &[Declaration],
        body: &Command,
    ) -> Result<(), CodegenError> {
        self.symbols.enter_scope();
        // The scope must be exited on the error path too, so the table stays
        // consistent afterwards.
        let result = self.gen_let_inner(ctx, decls, body);
        self.symbols.exit_scope();
        result
    }

    fn gen_let_inner(
        &mut self,
        ctx: &mut BlockCtx,
        decls: &[Declaration],
        body: &Command,
    ) -> Result<(), CodegenError> {
        for decl in decls {
            self.gen_declaration(ctx, decl)?;
        }
        self.gen_command(ctx, body)
    }

    fn gen_return(
        &mut self,
        ctx: &mut BlockCtx,
        value: &Expr,
        span: Span,
    ) -> Result<(), CodegenError> {
        match self.routine {
            RoutineKind::Func(expected) => {
                let ty = self.gen_expr(ctx, value)?;
                if ty != expected {
                    return Err(CodegenError::type_mismatch(
                        format!("function returns {}, found {}", expected, ty),
                        value.span,
                    ));
                }
                ctx.emit_simple(Opcode::Return);
                Ok(())
            }
            RoutineKind::Proc => Err(CodegenError::type_mismatch(
                "a `proc` body cannot return a value",
                span,
            )),
            RoutineKind::Entry => Err(CodegenError::type_mismatch(
                "`return` is only allowed inside a function body",
                span,
            )),
        }
    }

    // === Declarations ===

    fn gen_declaration(
        &mut self,
        ctx: &mut BlockCtx,
        decl: &Declaration,
    ) -> Result<(), CodegenError> {
        match &decl.kind {
            DeclarationKind::Const { name, value } => {
                // The initializer is evaluated before the name is declared,
                // so `const x ~ x` refers to any outer `x`, never itself.
                let ty = self.gen_expr(ctx, value)?;
                let slot = self.symbols.declare_const(name, ty)?;
                ctx.emit(Instruction::new(Opcode::StoreLocal, Operand::Slot(slot)));
                Ok(())
            }
            DeclarationKind::Var { name, ty } => {
                let ty = self.resolve_type(ty)?;
                // Reserve the slot only; the storage starts uninitialized.
                self.symbols.declare_var(name, ty)?;
                Ok(())
            }
            DeclarationKind::Proc { name, params, body } => {
                self.gen_routine_decl(name, params, None, body, decl.span)
            }
            DeclarationKind::Func {
                name,
                params,
                return_ty,
                body,
            } => {
                let return_ty = self.resolve_type(return_ty)?;
                self.gen_routine_decl(name, params, Some(return_ty), body, decl.span)
            }
        }
    }

    fn gen_routine_decl(
        &mut self,
        name: &Name,
        params: &[Param],
        return_ty: Option<Type>,
        body: &Command,
        span: Span,
    ) -> Result<(), CodegenError> {
        if params.len() > u8::MAX as usize {
            return Err(CodegenError::LimitExceeded {
                message: format!("`{}` has more than {} parameters", name.text, u8::MAX),
                span,
            });
        }
        let param_types = params
            .iter()
            .map(|param| self.resolve_type(&param.ty))
            .collect::<Result<Vec<_>, _>>()?;

        let pool_index = self.pool.reserve_code().map_err(|err| {
            CodegenError::LimitExceeded {
                message: err.to_string(),
                span,
            }
        })?;

        // Registered before the body is generated, so recursive calls (and
        // calls from later declarations in the same list) resolve.
        self.symbols.declare_routine(
            name,
            RoutineInfo {
                pool_index,
                params: param_types.clone(),
                return_ty,
            },
        )?;

        let block_id = self.program.reserve_block();
        let mut fctx = BlockCtx::new(block_id, params.len() as u8);

        self.symbols.enter_frame();
        let saved_routine = std::mem::replace(
            &mut self.routine,
            match return_ty {
                Some(ty) => RoutineKind::Func(ty),
                None => RoutineKind::Proc,
            },
        );
        let result = self.gen_routine_body(&mut fctx, params, &param_types, body);
        self.routine = saved_routine;
        let local_slot_count = self.symbols.exit_frame();
        result?;

        fctx.block.local_slot_count = local_slot_count;
        let block = finish_block(fctx)?;
        self.program.fill_block(block_id, block);
        self.pool.set_code(
            pool_index,
            CodeRef {
                block: block_id,
                arity: params.len() as u8,
                local_slot_count,
            },
        );
        Ok(())
    }

    fn gen_routine_body(
        &mut self,
        ctx: &mut BlockCtx,
        params: &[Param],
        param_types: &[Type],
        body: &Command,
    ) -> Result<(), CodegenError> {
        // Parameters take slots 0..arity, in declaration order; the VM's
        // call protocol stores popped arguments there.
        for (param, ty) in params.iter().zip(param_types) {
            self.symbols.declare_param(&param.name, *ty)?;
        }

        self.gen_command(ctx, body)?;

        // Fallback for a body that falls off the end: every code object
        // returns exactly one value.
        let zero = self.add_int_const(0, body.span)?;
        ctx.emit(Instruction::new(Opcode::LoadConst, Operand::Const(zero)));
        ctx.emit_simple(Opcode::Return);
        Ok(())
    }

    // === Expressions ===

    /// Generate one expression, checking its net stack effect is +1, and
    /// return its type.
    fn gen_expr(&mut self, ctx: &mut BlockCtx, expr: &Expr) -> Result<Type, CodegenError> {
        let depth_before = ctx.depth;
        let ty = self.gen_expr_kind(ctx, expr)?;
        if ctx.depth != depth_before + 1 {
            return Err(CodegenError::internal(format!(
                "expression left net stack effect {} (expected +1)",
                ctx.depth - depth_before
            )));
        }
        Ok(ty)
    }

    fn gen_expr_kind(&mut self, ctx: &mut BlockCtx, expr: &Expr) -> Result<Type, CodegenError> {
        match &expr.kind {
            ExprKind::IntLiteral(value) => {
                let index = self.add_int_const(*value, expr.span)?;
                ctx.emit(Instruction::new(Opcode::LoadConst, Operand::Const(index)));
                Ok(Type::Integer)
            }
            ExprKind::Var(name) => {
                let (slot, ty, frame) = self.resolve_value(name)?;
                ctx.emit(Instruction::new(self.load_op(frame), Operand::Slot(slot)));
                Ok(ty)
            }
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.gen_expr(ctx, operand)?;
                match op {
                    UnaryOp::Neg => {
                        if operand_ty != Type::Integer {
                            return Err(CodegenError::type_mismatch(
                                format!("unary `-` requires an Integer, found {}", operand_ty),
                                operand.span,
                            ));
                        }
                        ctx.emit_simple(Opcode::Neg);
                        Ok(Type::Integer)
                    }
                }
            }
            ExprKind::Binary { op, left, right } => self.gen_binary(ctx, *op, left, right, expr.span),
            ExprKind::Call { name, args } => self.gen_call_expr(ctx, name, args, expr.span),
            ExprKind::Grouped(inner) => self.gen_expr(ctx, inner),
        }
    }

    fn gen_binary(
        &mut self,
        ctx: &mut BlockCtx,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> Result<Type, CodegenError> {
        // Stack discipline: left first, then right, then the operator pops
        // both and pushes the result.
        let left_ty = self.gen_expr(ctx, left)?;
        let right_ty = self.gen_expr(ctx, right)?;

        let opcode = match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Mod => Opcode::Mod,
            BinaryOp::Lt => Opcode::CmpLt,
            BinaryOp::Gt => Opcode::CmpGt,
            BinaryOp::Eq => Opcode::CmpEq,
        };
        let result_ty = match op {
            BinaryOp::Eq => {
                if left_ty != right_ty {
                    return Err(CodegenError::type_mismatch(
                        format!(
                            "`=` requires operands of one type, found {} and {}",
                            left_ty, right_ty
                        ),
                        span,
                    ));
                }
                Type::Boolean
            }
            BinaryOp::Lt | BinaryOp::Gt => {
                self.check_integer_operands(op, left_ty, right_ty, span)?;
                Type::Boolean
            }
            _ => {
                self.check_integer_operands(op, left_ty, right_ty, span)?;
                Type::Integer
            }
        };

        ctx.emit_simple(opcode);
        Ok(result_ty)
    }

    fn check_integer_operands(
        &self,
        op: BinaryOp,
        left: Type,
        right: Type,
        span: Span,
    ) -> Result<(), CodegenError> {
        if left != Type::Integer || right != Type::Integer {
            return Err(CodegenError::type_mismatch(
                format!(
                    "operator `{}` requires Integer operands, found {} and {}",
                    op, left, right
                ),
                span,
            ));
        }
        Ok(())
    }

    fn gen_call_expr(
        &mut self,
        ctx: &mut BlockCtx,
        name: &Name,
        args: &[Expr],
        span: Span,
    ) -> Result<Type, CodegenError> {
        let symbol = self
            .symbols
            .resolve(&name.text)
            .ok_or_else(|| undeclared(name))?;
        match &symbol.kind {
            SymbolKind::Routine(info) => {
                let info = info.clone();
                match info.return_ty {
                    Some(return_ty) => {
                        self.gen_call(ctx, name, &info, args, span)?;
                        Ok(return_ty)
                    }
                    None => Err(CodegenError::type_mismatch(
                        format!("procedure `{}` does not return a value", name.text),
                        span,
                    )),
                }
            }
            SymbolKind::Builtin(_) => Err(CodegenError::type_mismatch(
                format!("`{}` cannot be used in an expression", name.text),
                span,
            )),
            _ => Err(CodegenError::type_mismatch(
                format!("`{}` is not a function", name.text),
                name.span,
            )),
        }
    }

    /// Shared call emission: arguments left-to-right, then the call opcode
    /// with the callee's pool index and arity. Pushes one result.
    fn gen_call(
        &mut self,
        ctx: &mut BlockCtx,
        name: &Name,
        info: &RoutineInfo,
        args: &[Expr],
        span: Span,
    ) -> Result<(), CodegenError> {
        if args.len() != info.params.len() {
            return Err(CodegenError::ArityMismatch {
                name: name.text.clone(),
                expected: info.params.len(),
                found: args.len(),
                span,
            });
        }
        for (index, (arg, expected)) in args.iter().zip(&info.params).enumerate() {
            let ty = self.gen_expr(ctx, arg)?;
            if ty != *expected {
                return Err(CodegenError::type_mismatch(
                    format!(
                        "argument {} of `{}` must be {}, found {}",
                        index + 1,
                        name.text,
                        expected,
                        ty
                    ),
                    arg.span,
                ));
            }
        }
        ctx.emit(Instruction::new(
            Opcode::Call,
            Operand::Code {
                pool: info.pool_index,
                arity: args.len() as u8,
            },
        ));
        Ok(())
    }

    fn gen_builtin(
        &mut self,
        ctx: &mut BlockCtx,
        builtin: Builtin,
        name: &Name,
        args: &[Expr],
        span: Span,
    ) -> Result<(), CodegenError> {
        if args.len() != 1 {
            return Err(CodegenError::ArityMismatch {
                name: name.text.clone(),
                expected: 1,
                found: args.len(),
                span,
            });
        }
        match builtin {
            Builtin::PutInt => {
                let ty = self.gen_expr(ctx, &args[0])?;
                if ty != Type::Integer {
                    return Err(CodegenError::type_mismatch(
                        format!("`putint` requires an Integer argument, found {}", ty),
                        args[0].span,
                    ));
                }
                ctx.emit_simple(Opcode::Print);
                Ok(())
            }
            Builtin::GetInt => {
                let ExprKind::Var(target) = &args[0].kind else {
                    return Err(CodegenError::type_mismatch(
                        "`getint` requires a variable argument",
                        args[0].span,
                    ));
                };
                let (slot, ty, frame) = self.resolve_assignable(target)?;
                if ty != Type::Integer {
                    return Err(CodegenError::type_mismatch(
                        format!("`getint` requires an Integer variable, found {}", ty),
                        target.span,
                    ));
                }
                ctx.emit_simple(Opcode::Read);
                ctx.emit(Instruction::new(
                    self.store_op(frame),
                    Operand::Slot(slot),
                ));
                Ok(())
            }
        }
    }

    // === Name resolution helpers ===

    /// Resolve a name to readable storage: `(slot, type, frame)`.
    fn resolve_value(&self, name: &Name) -> Result<(u16, Type, usize), CodegenError> {
        let symbol = self
            .symbols
            .resolve(&name.text)
            .ok_or_else(|| undeclared(name))?;
        match &symbol.kind {
            SymbolKind::Var { ty, slot }
            | SymbolKind::Const { ty, slot }
            | SymbolKind::Param { ty, slot } => {
                self.check_frame_access(symbol.frame, name)?;
                Ok((*slot, *ty, symbol.frame))
            }
            SymbolKind::Routine(_) | SymbolKind::Builtin(_) => Err(CodegenError::type_mismatch(
                format!("`{}` is a procedure or function, not a value", name.text),
                name.span,
            )),
        }
    }

    /// Resolve a name to writable storage: `(slot, type, frame)`.
    fn resolve_assignable(&self, name: &Name) -> Result<(u16, Type, usize), CodegenError> {
        let symbol = self
            .symbols
            .resolve(&name.text)
            .ok_or_else(|| undeclared(name))?;
        match &symbol.kind {
            SymbolKind::Var { ty, slot } | SymbolKind::Param { ty, slot } => {
                self.check_frame_access(symbol.frame, name)?;
                Ok((*slot, *ty, symbol.frame))
            }
            SymbolKind::Const { .. } => Err(CodegenError::type_mismatch(
                format!("cannot assign to constant `{}`", name.text),
                name.span,
            )),
            SymbolKind::Routine(_) | SymbolKind::Builtin(_) => Err(CodegenError::type_mismatch(
                format!("cannot assign to `{}`: not a variable", name.text),
                name.span,
            )),
        }
    }

    /// Storage is addressable from its own frame (local slots) and from the
    /// module frame (global slots). A local of some *enclosing* function is
    /// neither: there is no closure capture, so the name is not in scope
    /// for the current code object.
    fn check_frame_access(&self, frame: usize, name: &Name) -> Result<(), CodegenError> {
        if frame == self.symbols.current_frame() || frame == 0 {
            Ok(())
        } else {
            Err(undeclared(name))
        }
    }

    fn load_op(&self, frame: usize) -> Opcode {
        if frame == self.symbols.current_frame() {
            Opcode::LoadLocal
        } else {
            Opcode::LoadGlobal
        }
    }

    fn store_op(&self, frame: usize) -> Opcode {
        if frame == self.symbols.current_frame() {
            Opcode::StoreLocal
        } else {
            Opcode::StoreGlobal
        }
    }

    fn resolve_type(&self, denoter: &TypeDenoter) -> Result<Type, CodegenError> {
        Type::from_denoter(&denoter.name).ok_or_else(|| CodegenError::UndeclaredName {
            name: denoter.name.clone(),
            span: denoter.span,
        })
    }

    fn add_int_const(&mut self, value: i64, span: Span) -> Result<u16, CodegenError> {
        self.pool
            .add_int(value)
            .map_err(|err| CodegenError::LimitExceeded {
                message: err.to_string(),
                span,
            })
    }
}

fn undeclared(name: &Name) -> CodegenError {
    CodegenError::UndeclaredName {
        name: name.text.clone(),
        span: name.span,
    }
}

fn bind_label(ctx: &mut BlockCtx, label: LabelId) -> Result<(), CodegenError> {
    if ctx.block.bind_label(label) {
        Ok(())
    } else {
        Err(CodegenError::internal(format!(
            "label {} bound twice in block {}",
            label.id(),
            ctx.id.id()
        )))
    }
}

/// Close out a finished block: the stack must be balanced and every label
/// bound, or the generator has a bug.
fn finish_block(ctx: BlockCtx) -> Result<CodeBlock, CodegenError> {
    if ctx.depth != 0 {
        return Err(CodegenError::internal(format!(
            "block {} finished with stack depth {}",
            ctx.id.id(),
            ctx.depth
        )));
    }
    for index in 0..ctx.block.label_count() {
        if ctx.block.label_target(LabelId::new(index as u32)).is_none() {
            return Err(CodegenError::internal(format!(
                "label {} in block {} was never bound",
                index,
                ctx.id.id()
            )));
        }
    }
    Ok(ctx.block)
}
