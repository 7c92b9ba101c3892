//! Compile-time constant folding.
//!
//! Folds checked expressions whose value does not depend on the backend:
//!
//! - Literals, tuples and lists
//! - Unary and binary operators
//! - References to top-level declarations whose value is already known
//! - The built-in type constructors `List` and `Fn`
//! - Single-branch blocks with a constant condition
//!
//! Anything else yields `None` and is evaluated by the backend instead.

use rustc_hash::FxHashMap;
use yune_ast::{BinaryOp, UnaryOp};
use yune_core::{TypeValue, Value};

use crate::declaration::{DeclId, Declaration, Declarations, TopLevel};
use crate::typed::{TypedBlock, TypedExpr, TypedExprKind, TypedStmt};

/// Constant expression evaluator.
pub struct ConstEvaluator<'a, 'm> {
    declarations: &'a Declarations<'m>,
    values: &'a FxHashMap<DeclId, Value>,
}

impl<'a, 'm> ConstEvaluator<'a, 'm> {
    pub fn new(declarations: &'a Declarations<'m>, values: &'a FxHashMap<DeclId, Value>) -> Self {
        Self {
            declarations,
            values,
        }
    }

    /// Evaluate an expression as a constant value.
    pub fn eval(&self, expr: &TypedExpr) -> Option<Value> {
        match &expr.kind {
            TypedExprKind::Integer(v) => Some(Value::Int(*v)),
            TypedExprKind::Float(v) => Some(Value::float(*v)),
            TypedExprKind::Bool(v) => Some(Value::Bool(*v)),
            TypedExprKind::String(v) => Some(Value::String(v.clone())),
            TypedExprKind::Value(v) => Some(v.clone()),
            TypedExprKind::Variable { declaration, .. } => match declaration {
                Declaration::TopLevel(id) => self.values.get(id).cloned(),
                Declaration::Local(_) => None,
            },
            TypedExprKind::Tuple(elements) => {
                let values = self.eval_all(elements)?;
                if expr.ty == TypeValue::Type {
                    let types = values
                        .into_iter()
                        .map(|v| match v {
                            Value::Type(t) => Some(t),
                            _ => None,
                        })
                        .collect::<Option<Vec<_>>>()?;
                    Some(Value::Type(TypeValue::Tuple(types)))
                } else {
                    Some(Value::Tuple(values))
                }
            }
            TypedExprKind::List(elements) => Some(Value::List(self.eval_all(elements)?)),
            TypedExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            TypedExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right),
            TypedExprKind::Call {
                function,
                arguments,
            } => self.eval_call(function, arguments),
            TypedExprKind::Closure { .. } => None,
        }
    }

    /// Evaluate a block that reduces to one expression.
    pub fn eval_block(&self, block: &TypedBlock) -> Option<Value> {
        match block.statements.as_slice() {
            [TypedStmt::Expression(expr)] => self.eval(expr),
            [
                TypedStmt::Branch {
                    condition,
                    then,
                    otherwise,
                    ..
                },
            ] => match self.eval(condition)? {
                Value::Bool(true) => self.eval_block(then),
                Value::Bool(false) => self.eval_block(otherwise),
                _ => None,
            },
            _ => None,
        }
    }

    fn eval_all(&self, exprs: &[TypedExpr]) -> Option<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval_call(&self, function: &TypedExpr, arguments: &[TypedExpr]) -> Option<Value> {
        let TypedExprKind::Variable {
            declaration: Declaration::TopLevel(id),
            ..
        } = &function.kind
        else {
            return None;
        };
        let TopLevel::Builtin(builtin) = self.declarations.get(*id) else {
            return None;
        };
        let types = arguments
            .iter()
            .map(|argument| match self.eval(argument)? {
                Value::Type(t) => Some(t),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        builtin.construct(&types).map(Value::Type)
    }

    fn eval_unary(&self, op: UnaryOp, operand: &TypedExpr) -> Option<Value> {
        let value = self.eval(operand)?;
        match (op, value) {
            (UnaryOp::Negate, Value::Int(v)) => v.checked_neg().map(Value::Int),
            (UnaryOp::Negate, Value::Float(v)) => Some(Value::Float(-v)),
            (UnaryOp::Not, Value::Bool(v)) => Some(Value::Bool(!v)),
            _ => None,
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &TypedExpr, right: &TypedExpr) -> Option<Value> {
        let left = self.eval(left)?;
        let right = self.eval(right)?;

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                self.eval_arithmetic(op, &left, &right)
            }
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
                self.eval_ordering(op, &left, &right)
            }
            BinaryOp::Equal => Some(Value::Bool(left == right)),
            BinaryOp::NotEqual => Some(Value::Bool(left != right)),
            BinaryOp::And | BinaryOp::Or => match (left, right) {
                (Value::Bool(l), Value::Bool(r)) => Some(Value::Bool(if op == BinaryOp::And {
                    l && r
                } else {
                    l || r
                })),
                _ => None,
            },
        }
    }

    // Overflow and division by zero are left to the backend.
    fn eval_arithmetic(&self, op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => {
                let result = match op {
                    BinaryOp::Add => l.checked_add(*r),
                    BinaryOp::Sub => l.checked_sub(*r),
                    BinaryOp::Mul => l.checked_mul(*r),
                    BinaryOp::Div => l.checked_div(*r),
                    _ => None,
                };
                result.map(Value::Int)
            }
            (Value::Float(l), Value::Float(r)) => {
                let (l, r) = (l.into_inner(), r.into_inner());
                let result = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div if r != 0.0 => l / r,
                    _ => return None,
                };
                Some(Value::float(result))
            }
            _ => None,
        }
    }

    fn eval_ordering(&self, op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
        let ordering = match (left, right) {
            (Value::Int(l), Value::Int(r)) => l.cmp(r),
            (Value::Float(l), Value::Float(r)) => l.cmp(r),
            _ => return None,
        };
        Some(Value::Bool(match op {
            BinaryOp::Less => ordering.is_lt(),
            BinaryOp::Greater => ordering.is_gt(),
            BinaryOp::LessEqual => ordering.is_le(),
            BinaryOp::GreaterEqual => ordering.is_ge(),
            _ => return None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{Builtin, LocalKind};
    use yune_ast::Module;
    use yune_core::{Name, Span};

    fn at() -> Span {
        Span::point(1, 1)
    }

    fn int(v: i64) -> TypedExpr {
        TypedExpr::new(at(), TypeValue::Int, TypedExprKind::Integer(v))
    }

    fn float(v: f64) -> TypedExpr {
        TypedExpr::new(at(), TypeValue::Float, TypedExprKind::Float(v))
    }

    fn binary(op: BinaryOp, ty: TypeValue, left: TypedExpr, right: TypedExpr) -> TypedExpr {
        TypedExpr::new(
            at(),
            ty,
            TypedExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    fn global(declarations: &Declarations<'_>, name: &str, ty: TypeValue) -> TypedExpr {
        TypedExpr::new(
            at(),
            ty,
            TypedExprKind::Variable {
                name: name.to_string(),
                declaration: Declaration::TopLevel(declarations.lookup(name).unwrap()),
            },
        )
    }

    #[test]
    fn folds_arithmetic() {
        let module = Module::default();
        let declarations = Declarations::collect(&module).unwrap();
        let values = FxHashMap::default();
        let eval = ConstEvaluator::new(&declarations, &values);

        let sum = binary(BinaryOp::Add, TypeValue::Int, int(1), int(2));
        assert_eq!(eval.eval(&sum), Some(Value::Int(3)));

        let quotient = binary(BinaryOp::Div, TypeValue::Float, float(1.0), float(4.0));
        assert_eq!(eval.eval(&quotient), Some(Value::float(0.25)));

        let less = binary(BinaryOp::Less, TypeValue::Bool, int(1), int(2));
        assert_eq!(eval.eval(&less), Some(Value::Bool(true)));
    }

    #[test]
    fn leaves_division_by_zero_and_overflow_alone() {
        let module = Module::default();
        let declarations = Declarations::collect(&module).unwrap();
        let values = FxHashMap::default();
        let eval = ConstEvaluator::new(&declarations, &values);

        assert_eq!(eval.eval(&binary(BinaryOp::Div, TypeValue::Int, int(1), int(0))), None);
        assert_eq!(
            eval.eval(&binary(BinaryOp::Add, TypeValue::Int, int(i64::MAX), int(1))),
            None
        );
    }

    #[test]
    fn folds_type_constructors() {
        let module = Module::default();
        let declarations = Declarations::collect(&module).unwrap();
        let mut values = FxHashMap::default();
        for (id, builtin) in declarations.builtins() {
            if let Some(aliased) = builtin.aliased() {
                values.insert(id, Value::Type(aliased));
            }
        }
        let eval = ConstEvaluator::new(&declarations, &values);

        // List(Int)
        let list = TypedExpr::new(
            at(),
            TypeValue::Type,
            TypedExprKind::Call {
                function: Box::new(global(&declarations, "List", Builtin::List.ty())),
                arguments: vec![global(&declarations, "Int", TypeValue::Type)],
            },
        );
        assert_eq!(
            eval.eval(&list),
            Some(Value::Type(TypeValue::list(TypeValue::Int)))
        );

        // (Int, Bool) in type position
        let pair = TypedExpr::new(
            at(),
            TypeValue::Type,
            TypedExprKind::Tuple(vec![
                global(&declarations, "Int", TypeValue::Type),
                global(&declarations, "Bool", TypeValue::Type),
            ]),
        );
        assert_eq!(
            eval.eval(&pair),
            Some(Value::Type(TypeValue::Tuple(vec![TypeValue::Int, TypeValue::Bool])))
        );
    }

    #[test]
    fn locals_are_not_constant() {
        let module = Module::default();
        let declarations = Declarations::collect(&module).unwrap();
        let values = FxHashMap::default();
        let eval = ConstEvaluator::new(&declarations, &values);

        let local = TypedExpr::new(
            at(),
            TypeValue::Int,
            TypedExprKind::Variable {
                name: "x".into(),
                declaration: Declaration::local(
                    Name::new("x", at()),
                    LocalKind::Parameter,
                    TypeValue::Int,
                ),
            },
        );
        assert_eq!(eval.eval(&local), None);
    }

    #[test]
    fn constant_branch_folds() {
        let module = Module::default();
        let declarations = Declarations::collect(&module).unwrap();
        let values = FxHashMap::default();
        let eval = ConstEvaluator::new(&declarations, &values);

        let block = |expr: TypedExpr| TypedBlock {
            span: at(),
            ty: expr.ty.clone(),
            statements: vec![TypedStmt::Expression(expr)],
        };
        let branch = TypedBlock {
            span: at(),
            ty: TypeValue::Int,
            statements: vec![TypedStmt::Branch {
                span: at(),
                ty: TypeValue::Int,
                condition: TypedExpr::new(at(), TypeValue::Bool, TypedExprKind::Bool(false)),
                then: block(int(1)),
                otherwise: block(int(2)),
            }],
        };
        assert_eq!(eval.eval_block(&branch), Some(Value::Int(2)));
    }
}
