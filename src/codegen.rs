use inkwell::{
    builder::Builder,
    context::Context,
    module::Module,
    types::BasicTypeEnum,
    values::{BasicValueEnum, FloatValue, FunctionValue},
};

use crate::ast::{ASTNode, Expression, Function, Prototype};
use crate::backend::{Backend, Bindings, CodegenError};

/// LLVM IR backend. Every value is a `double` and every function has the
/// type `double(double, ...)`.
pub struct Codegen<'a> {
    pub context: &'a Context,
    pub module: Module<'a>,
    pub builder: Builder<'a>,
    named_values: Bindings<FloatValue<'a>>,
}

impl<'a> Codegen<'a> {
    pub fn new(context: &'a Context) -> Codegen<'a> {
        let module = context.create_module("calculator_module");
        let builder = context.create_builder();

        Codegen {
            context,
            module,
            builder,
            named_values: Bindings::default(),
        }
    }

    fn codegen_expr(&mut self, expr: &Expression) -> Result<FloatValue<'a>, CodegenError> {
        let (base, steps) = expr.unfold_chain();
        let mut lhs = self.codegen_operand(base)?;
        for (op, right) in steps {
            let rhs = self.codegen_expr(right)?;
            lhs = match op {
                '+' => self.builder.build_float_add(lhs, rhs, "addtmp"),
                '-' => self.builder.build_float_sub(lhs, rhs, "subtmp"),
                '*' => self.builder.build_float_mul(lhs, rhs, "multmp"),
                _ => return Err(CodegenError::UnknownOperator(op)),
            };
        }
        Ok(lhs)
    }

    fn codegen_operand(&mut self, expr: &Expression) -> Result<FloatValue<'a>, CodegenError> {
        match expr {
            Expression::Number(value) => Ok(self.context.f64_type().const_float(*value)),
            Expression::Variable(name) => self.named_values.lookup(name),
            Expression::Binary(..) => self.codegen_expr(expr),
            Expression::Call(callee, args) => {
                let func = self
                    .module
                    .get_function(callee)
                    .ok_or_else(|| CodegenError::UnknownFunction(callee.clone()))?;

                if func.count_params() as usize != args.len() {
                    return Err(CodegenError::ArgumentCountMismatch(
                        callee.clone(),
                        func.count_params() as usize,
                        args.len(),
                    ));
                }

                let mut argsv: Vec<BasicValueEnum> = Vec::with_capacity(args.len());
                for arg in args {
                    argsv.push(self.codegen_expr(arg)?.into());
                }

                self.builder
                    .build_call(func, argsv.as_slice(), "calltmp")
                    .try_as_basic_value()
                    .left()
                    .map(|value| value.into_float_value())
                    .ok_or_else(|| CodegenError::InvalidFunction(callee.clone()))
            }
        }
    }

    fn compile_proto(&self, proto: &Prototype) -> Result<FunctionValue<'a>, CodegenError> {
        Bindings::bind(proto, std::iter::repeat(()).take(proto.args.len()))?;

        if !proto.is_anonymous() {
            if let Some(existing) = self.module.get_function(&proto.name) {
                if existing.count_params() as usize != proto.args.len() {
                    return Err(CodegenError::ArgumentCountMismatch(
                        proto.name.clone(),
                        existing.count_params() as usize,
                        proto.args.len(),
                    ));
                }
                return Ok(existing);
            }
        }

        let args_types = std::iter::repeat(self.context.f64_type())
            .take(proto.args.len())
            .map(|f| f.into())
            .collect::<Vec<BasicTypeEnum>>();
        let args_types = args_types.as_slice();

        let fn_type = self.context.f64_type().fn_type(args_types, false);
        let fn_val = self.module.add_function(proto.name.as_str(), fn_type, None);

        for (arg, name) in fn_val.get_param_iter().zip(&proto.args) {
            arg.into_float_value().set_name(name.as_str());
        }

        Ok(fn_val)
    }

    fn compile_fn(&mut self, function: &Function) -> Result<FunctionValue<'a>, CodegenError> {
        let Function {
            prototype: proto,
            body,
        } = function;
        let declared = !proto.is_anonymous() && self.module.get_function(&proto.name).is_some();
        let llvm_func = self.compile_proto(proto)?;
        if llvm_func.count_basic_blocks() > 0 {
            return Err(CodegenError::Redefinition(proto.name.clone()));
        }

        let result = self.compile_body(llvm_func, proto, body);
        if result.is_err() {
            Self::discard_body(llvm_func, declared);
        }
        result
    }

    /// Undo a failed definition. A function that was declared by an earlier
    /// `extern` goes back to being a declaration; anything else is removed.
    fn discard_body(llvm_func: FunctionValue<'a>, keep_declaration: bool) {
        if keep_declaration {
            for block in llvm_func.get_basic_blocks() {
                // only fails for a block with no parent, which these all have
                let _ = unsafe { block.delete() };
            }
        } else {
            unsafe {
                llvm_func.delete();
            }
        }
    }

    fn compile_body(
        &mut self,
        llvm_func: FunctionValue<'a>,
        proto: &Prototype,
        body: &Expression,
    ) -> Result<FunctionValue<'a>, CodegenError> {
        self.named_values = Bindings::bind(
            proto,
            llvm_func
                .get_param_iter()
                .map(|arg| arg.into_float_value()),
        )?;

        let entry = self.context.append_basic_block(llvm_func, "entry");
        self.builder.position_at_end(entry);

        let body = self.codegen_expr(body)?;
        self.builder.build_return(Some(&body));

        if llvm_func.verify(true) {
            Ok(llvm_func)
        } else {
            Err(CodegenError::InvalidFunction(proto.name.clone()))
        }
    }
}

impl<'a> Backend for Codegen<'a> {
    /// textual IR of the emitted function
    type Output = String;

    fn generate(&mut self, node: ASTNode) -> Result<String, CodegenError> {
        let func = match &node {
            ASTNode::Function(func) => self.compile_fn(func),
            ASTNode::Extern(proto) => self.compile_proto(proto),
        }?;

        Ok(func.print_to_string().to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use inkwell::context::Context;

    use super::Codegen;
    use crate::backend::{Backend, CodegenError};
    use crate::parser::Parser;

    fn generate_all(codegen: &mut Codegen, input: &str) -> Result<Vec<String>, CodegenError> {
        let ast = Parser::default().parse_str(input).unwrap();
        ast.into_iter().map(|node| codegen.generate(node)).collect()
    }

    #[test]
    fn codegen_works() {
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        let ir = generate_all(&mut codegen, "extern sin(x); def thing(x) sin(x) * x;").unwrap();
        assert!(ir[0].contains("declare double @sin(double"));
        assert!(ir[1].contains("define double @thing(double %x)"));
        assert!(ir[1].contains("fmul"));
        assert!(codegen.module.get_function("thing").is_some());
    }

    #[test]
    fn top_level_expression_is_anonymous_function() {
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        let ir = generate_all(&mut codegen, "1 + 2 * 3").unwrap();
        assert!(ir[0].contains("define double @"));
        assert!(ir[0].contains("ret double"));
    }

    #[test]
    fn semantic_errors() {
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        assert_eq!(
            generate_all(&mut codegen, "def f(a) b"),
            Err(CodegenError::UnknownVariable("b".to_string()))
        );
        assert!(codegen.module.get_function("f").is_none());
        assert_eq!(
            generate_all(&mut codegen, "g(1)"),
            Err(CodegenError::UnknownFunction("g".to_string()))
        );
        assert_eq!(
            generate_all(&mut codegen, "extern cos(x); cos(1, 2)"),
            Err(CodegenError::ArgumentCountMismatch("cos".to_string(), 1, 2))
        );
        assert_eq!(
            generate_all(&mut codegen, "def h(a a) a"),
            Err(CodegenError::DuplicateParameter("h".to_string(), "a".to_string()))
        );
        assert_eq!(
            generate_all(&mut codegen, "extern pow(x x)"),
            Err(CodegenError::DuplicateParameter("pow".to_string(), "x".to_string()))
        );
        assert_eq!(
            generate_all(&mut codegen, "def k(a) a; def k(b) b"),
            Err(CodegenError::Redefinition("k".to_string()))
        );
    }

    #[test]
    fn definition_fills_prior_extern() {
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        generate_all(&mut codegen, "extern twice(x); def twice(x) x + x; twice(4)").unwrap();
        let func = codegen.module.get_function("twice").unwrap();
        assert_eq!(func.count_basic_blocks(), 1);
    }

    #[test]
    fn failed_definition_keeps_prior_extern() {
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        assert_eq!(
            generate_all(&mut codegen, "extern cos(x); def cos(x) y"),
            Err(CodegenError::UnknownVariable("y".to_string()))
        );
        let cos = codegen.module.get_function("cos").unwrap();
        assert_eq!(cos.count_basic_blocks(), 0);

        let ir = generate_all(&mut codegen, "cos(1)").unwrap();
        assert!(ir[0].contains("call double @cos(double"));

        generate_all(&mut codegen, "def cos(x) x * 2").unwrap();
        assert_eq!(
            codegen.module.get_function("cos").unwrap().count_basic_blocks(),
            1
        );
    }

    #[test]
    fn long_operator_chain() {
        let context = Context::create();
        let mut codegen = Codegen::new(&context);
        let body = vec!["x"; 100_000].join("+");
        let ir = generate_all(&mut codegen, &format!("def sum(x) {}", body)).unwrap();
        assert!(ir[0].contains("define double @sum(double %x)"));
        assert!(ir[0].contains("fadd"));
    }
}
