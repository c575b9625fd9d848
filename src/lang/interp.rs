//! Tree-walking interpreter for candidate scoring scripts.
//!
//! Runs only inside the disposable worker process. All numbers are f64;
//! booleans exist solely for conditions. Randomness comes from a seeded
//! generator handed in by the harness, never from ambient entropy.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ast::{BinOp, Expr, Program, Stmt, UnaryOp};
use super::LangError;

/// Call-depth cap. Runaway recursion becomes a runtime error instead of
/// blowing the worker's stack.
const MAX_CALL_DEPTH: usize = 64;

/// A runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Num(f64),
    Bool(bool),
}

impl Value {
    fn as_num(&self) -> Result<f64, LangError> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Bool(_) => Err(runtime("expected a number, found a boolean")),
        }
    }

    fn as_bool(&self) -> Result<bool, LangError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Num(_) => Err(runtime("expected a boolean, found a number")),
        }
    }
}

fn runtime(message: &str) -> LangError {
    LangError::Runtime {
        message: message.into(),
    }
}

enum Flow {
    Normal,
    Return(Value),
}

/// Interpreter over a parsed program.
///
/// Builtin availability follows the program's `use` declarations; calling a
/// function from a module the program did not import is a runtime error.
pub struct Interpreter<'p> {
    program: &'p Program,
    math_enabled: bool,
    random_enabled: bool,
    rng: StdRng,
}

impl<'p> Interpreter<'p> {
    /// Build an interpreter. `rng_seed` drives the `random` module.
    pub fn new(program: &'p Program, rng_seed: u64) -> Self {
        let math_enabled = program.imports.iter().any(|m| m == "math");
        let random_enabled = program.imports.iter().any(|m| m == "random");
        Self {
            program,
            math_enabled,
            random_enabled,
            rng: StdRng::seed_from_u64(rng_seed),
        }
    }

    /// Reseed the `random` module, e.g. once per instance.
    pub fn reseed(&mut self, rng_seed: u64) {
        self.rng = StdRng::seed_from_u64(rng_seed);
    }

    /// Call a named function with numeric arguments and return its numeric
    /// result. The result may be non-finite; that is the caller's concern.
    pub fn call(&mut self, name: &str, args: &[f64]) -> Result<f64, LangError> {
        let values: Vec<Value> = args.iter().map(|a| Value::Num(*a)).collect();
        let result = self.call_value(name, &values, 0)?;
        result.as_num()
    }

    fn call_value(&mut self, name: &str, args: &[Value], depth: usize) -> Result<Value, LangError> {
        if depth >= MAX_CALL_DEPTH {
            return Err(runtime("call depth limit exceeded"));
        }
        let function = self
            .program
            .function(name)
            .ok_or_else(|| runtime(&format!("unknown function '{name}'")))?;
        if function.params.len() != args.len() {
            return Err(runtime(&format!(
                "function '{name}' takes {} arguments, got {}",
                function.params.len(),
                args.len()
            )));
        }
        let mut scope: HashMap<String, Value> = function
            .params
            .iter()
            .cloned()
            .zip(args.iter().copied())
            .collect();
        match self.run_block(&function.body, &mut scope, depth)? {
            Flow::Return(value) => Ok(value),
            // A function that falls off the end yields 0, like a missing
            // return in the original candidates would raise; being lenient
            // here keeps trivial scripts usable.
            Flow::Normal => Ok(Value::Num(0.0)),
        }
    }

    fn run_block(
        &mut self,
        stmts: &[Stmt],
        scope: &mut HashMap<String, Value>,
        depth: usize,
    ) -> Result<Flow, LangError> {
        for stmt in stmts {
            match stmt {
                Stmt::Let(name, expr) => {
                    let value = self.eval(expr, scope, depth)?;
                    scope.insert(name.clone(), value);
                }
                Stmt::Assign(name, expr) => {
                    if !scope.contains_key(name) {
                        return Err(runtime(&format!("assignment to undefined variable '{name}'")));
                    }
                    let value = self.eval(expr, scope, depth)?;
                    scope.insert(name.clone(), value);
                }
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    let branch = if self.eval(cond, scope, depth)?.as_bool()? {
                        then_body
                    } else {
                        else_body
                    };
                    if let Flow::Return(value) = self.run_block(branch, scope, depth)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Stmt::While { cond, body } => {
                    while self.eval(cond, scope, depth)?.as_bool()? {
                        if let Flow::Return(value) = self.run_block(body, scope, depth)? {
                            return Ok(Flow::Return(value));
                        }
                    }
                }
                Stmt::Return(expr) => {
                    let value = self.eval(expr, scope, depth)?;
                    return Ok(Flow::Return(value));
                }
                Stmt::Expr(expr) => {
                    self.eval(expr, scope, depth)?;
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(
        &mut self,
        expr: &Expr,
        scope: &mut HashMap<String, Value>,
        depth: usize,
    ) -> Result<Value, LangError> {
        match expr {
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(name) => scope
                .get(name)
                .copied()
                .ok_or_else(|| runtime(&format!("undefined variable '{name}'"))),
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, scope, depth)?;
                match op {
                    UnaryOp::Neg => Ok(Value::Num(-value.as_num()?)),
                    UnaryOp::Not => Ok(Value::Bool(!value.as_bool()?)),
                }
            }
            Expr::Binary(op, left, right) => self.eval_binary(*op, left, right, scope, depth),
            Expr::Call(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, scope, depth)?);
                }
                if let Some(result) = self.call_builtin(name, &values)? {
                    return Ok(result);
                }
                self.call_value(name, &values, depth + 1)
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        scope: &mut HashMap<String, Value>,
        depth: usize,
    ) -> Result<Value, LangError> {
        // Short-circuit forms evaluate the right side lazily.
        if op == BinOp::And {
            if !self.eval(left, scope, depth)?.as_bool()? {
                return Ok(Value::Bool(false));
            }
            return Ok(Value::Bool(self.eval(right, scope, depth)?.as_bool()?));
        }
        if op == BinOp::Or {
            if self.eval(left, scope, depth)?.as_bool()? {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(self.eval(right, scope, depth)?.as_bool()?));
        }

        let lhs = self.eval(left, scope, depth)?;
        let rhs = self.eval(right, scope, depth)?;

        if op == BinOp::Eq || op == BinOp::Ne {
            let equal = match (lhs, rhs) {
                (Value::Num(a), Value::Num(b)) => a == b,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                _ => false,
            };
            return Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }));
        }

        let a = lhs.as_num()?;
        let b = rhs.as_num()?;
        let result = match op {
            BinOp::Add => Value::Num(a + b),
            BinOp::Sub => Value::Num(a - b),
            BinOp::Mul => Value::Num(a * b),
            BinOp::Div => Value::Num(a / b),
            BinOp::Rem => Value::Num(a % b),
            BinOp::Lt => Value::Bool(a < b),
            BinOp::Le => Value::Bool(a <= b),
            BinOp::Gt => Value::Bool(a > b),
            BinOp::Ge => Value::Bool(a >= b),
            BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or => unreachable!("handled above"),
        };
        Ok(result)
    }

    /// Dispatch to a builtin, or `None` if the name is not a builtin.
    fn call_builtin(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, LangError> {
        let result = match name {
            // math
            "abs" => Some(self.math1(name, args, f64::abs)?),
            "sqrt" => Some(self.math1(name, args, f64::sqrt)?),
            "exp" => Some(self.math1(name, args, f64::exp)?),
            "ln" => Some(self.math1(name, args, f64::ln)?),
            "floor" => Some(self.math1(name, args, f64::floor)?),
            "ceil" => Some(self.math1(name, args, f64::ceil)?),
            "round" => Some(self.math1(name, args, f64::round)?),
            "pow" => Some(self.math2(name, args, f64::powf)?),
            "min" => Some(self.math2(name, args, f64::min)?),
            "max" => Some(self.math2(name, args, f64::max)?),
            "inf" => {
                self.require_math(name)?;
                expect_arity(name, args, 0)?;
                Some(Value::Num(f64::INFINITY))
            }
            "neg_inf" => {
                self.require_math(name)?;
                expect_arity(name, args, 0)?;
                Some(Value::Num(f64::NEG_INFINITY))
            }
            // random
            "uniform" => {
                self.require_random(name)?;
                expect_arity(name, args, 2)?;
                let lo = args[0].as_num()?;
                let hi = args[1].as_num()?;
                if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                    return Err(runtime("uniform(lo, hi) requires finite lo < hi"));
                }
                Some(Value::Num(self.rng.gen_range(lo..hi)))
            }
            "next" => {
                self.require_random(name)?;
                expect_arity(name, args, 0)?;
                Some(Value::Num(self.rng.gen_range(0.0..1.0)))
            }
            _ => None,
        };
        Ok(result)
    }

    fn require_math(&self, name: &str) -> Result<(), LangError> {
        if self.math_enabled {
            Ok(())
        } else {
            Err(runtime(&format!("'{name}' requires 'use math;'")))
        }
    }

    fn require_random(&self, name: &str) -> Result<(), LangError> {
        if self.random_enabled {
            Ok(())
        } else {
            Err(runtime(&format!("'{name}' requires 'use random;'")))
        }
    }

    fn math1(
        &self,
        name: &str,
        args: &[Value],
        f: impl Fn(f64) -> f64,
    ) -> Result<Value, LangError> {
        self.require_math(name)?;
        expect_arity(name, args, 1)?;
        Ok(Value::Num(f(args[0].as_num()?)))
    }

    fn math2(
        &self,
        name: &str,
        args: &[Value],
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, LangError> {
        self.require_math(name)?;
        expect_arity(name, args, 2)?;
        Ok(Value::Num(f(args[0].as_num()?, args[1].as_num()?)))
    }
}

fn expect_arity(name: &str, args: &[Value], arity: usize) -> Result<(), LangError> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(runtime(&format!(
            "'{name}' takes {arity} arguments, got {}",
            args.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parse;

    fn run(source: &str, args: &[f64]) -> Result<f64, LangError> {
        let program = parse(source).unwrap();
        Interpreter::new(&program, 0).call("score_bin", args)
    }

    #[test]
    fn test_arithmetic_and_locals() {
        let source = "fn score_bin(a, b, c, d) { let waste = b - a; return -waste; }";
        assert_eq!(run(source, &[30.0, 100.0, 0.0, 0.0]).unwrap(), -70.0);
    }

    #[test]
    fn test_conditionals() {
        let source = "fn score_bin(a, b, c, d) {
            if a > b { return -1000.0; }
            if a == b { return 100.0; }
            return b - a;
        }";
        assert_eq!(run(source, &[50.0, 50.0, 0.0, 0.0]).unwrap(), 100.0);
        assert_eq!(run(source, &[60.0, 50.0, 0.0, 0.0]).unwrap(), -1000.0);
        assert_eq!(run(source, &[10.0, 50.0, 0.0, 0.0]).unwrap(), 40.0);
    }

    #[test]
    fn test_while_loop() {
        let source = "fn score_bin(a, b, c, d) {
            let total = 0;
            let n = a;
            while n > 0 { total = total + n; n = n - 1; }
            return total;
        }";
        assert_eq!(run(source, &[4.0, 0.0, 0.0, 0.0]).unwrap(), 10.0);
    }

    #[test]
    fn test_math_builtins_gated_on_import() {
        let gated = "fn score_bin(a, b, c, d) { return sqrt(a); }";
        assert!(run(gated, &[4.0, 0.0, 0.0, 0.0]).is_err());

        let imported = "use math; fn score_bin(a, b, c, d) { return sqrt(a); }";
        assert_eq!(run(imported, &[4.0, 0.0, 0.0, 0.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_helper_functions() {
        let source = "use math;
        fn waste(item, cap) { return cap - item; }
        fn score_bin(a, b, c, d) { return -waste(a, b); }";
        assert_eq!(run(source, &[30.0, 100.0, 0.0, 0.0]).unwrap(), -70.0);
    }

    #[test]
    fn test_recursion_depth_capped() {
        let source = "fn loop_forever(x) { return loop_forever(x); }
        fn score_bin(a, b, c, d) { return loop_forever(a); }";
        let err = run(source, &[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert!(matches!(err, LangError::Runtime { .. }));
    }

    #[test]
    fn test_random_is_deterministic_per_seed() {
        let source = "use random; fn score_bin(a, b, c, d) { return uniform(0, 1); }";
        let program = parse(source).unwrap();
        let a = Interpreter::new(&program, 7).call("score_bin", &[0.0; 4]).unwrap();
        let b = Interpreter::new(&program, 7).call("score_bin", &[0.0; 4]).unwrap();
        let c = Interpreter::new(&program, 8).call("score_bin", &[0.0; 4]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_undefined_variable_is_runtime_error() {
        let source = "fn score_bin(a, b, c, d) { return missing; }";
        assert!(matches!(
            run(source, &[0.0; 4]),
            Err(LangError::Runtime { .. })
        ));
    }

    #[test]
    fn test_boolean_result_is_not_a_number() {
        let source = "fn score_bin(a, b, c, d) { return a > b; }";
        assert!(run(source, &[1.0, 2.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_division_yields_infinity_not_error() {
        let source = "fn score_bin(a, b, c, d) { return a / d; }";
        let value = run(source, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(value.is_infinite());
    }
}
