use std::sync::Arc;

use crate::{
    ast::{Bind, Expr},
    error::StaticError,
};

/// Checks variable scoping before anything is evaluated: every variable
/// must be bound, and `local` binding names and function parameter names
/// must be unique within their own lists. `local` bindings are in scope in
/// each other's bodies, so mutual recursion passes.
pub fn analyze(expr: &Expr) -> Result<(), StaticError> {
    let mut scope: Vec<Arc<str>> = Vec::new();
    check(expr, &mut scope)
}

fn check(expr: &Expr, scope: &mut Vec<Arc<str>>) -> Result<(), StaticError> {
    match expr {
        Expr::Null(_) | Expr::Boolean(..) | Expr::Number(..) | Expr::Str(..) => Ok(()),
        Expr::Var(name, location) => {
            if scope.iter().any(|bound| bound == name) {
                Ok(())
            } else {
                Err(StaticError::new(
                    format!("unknown variable: {}", name),
                    location.clone(),
                ))
            }
        }
        Expr::Array(elements, _) => {
            for element in elements {
                check(element, scope)?;
            }
            Ok(())
        }
        Expr::Local {
            binds,
            body,
            location: _,
        } => {
            check_unique_binds(binds)?;
            let depth = scope.len();
            for bind in binds {
                scope.push(bind.name.clone());
            }
            let mut result = Ok(());
            for bind in binds {
                result = check(&bind.value, scope);
                if result.is_err() {
                    break;
                }
            }
            if result.is_ok() {
                result = check(body, scope);
            }
            scope.truncate(depth);
            result
        }
        Expr::Function(def, location) => {
            for (i, param) in def.params.iter().enumerate() {
                if def.params[..i].contains(param) {
                    return Err(StaticError::new(
                        format!("duplicate parameter: {}", param),
                        location.clone(),
                    ));
                }
            }
            let depth = scope.len();
            for param in &def.params {
                scope.push(param.clone());
            }
            let result = check(&def.body, scope);
            scope.truncate(depth);
            result
        }
        Expr::Call { callee, args, .. } => {
            check(callee, scope)?;
            for arg in args {
                check(arg, scope)?;
            }
            Ok(())
        }
        Expr::Index { target, index, .. } => {
            check(target, scope)?;
            check(index, scope)
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            check(cond, scope)?;
            check(then_branch, scope)?;
            match else_branch {
                Some(else_branch) => check(else_branch, scope),
                None => Ok(()),
            }
        }
        Expr::Unary { operand, .. } => check(operand, scope),
        Expr::Binary { left, right, .. } => {
            check(left, scope)?;
            check(right, scope)
        }
        Expr::ErrorExpr { operand, .. } => check(operand, scope),
    }
}

fn check_unique_binds(binds: &[Bind]) -> Result<(), StaticError> {
    for (i, bind) in binds.iter().enumerate() {
        if binds[..i].iter().any(|earlier| earlier.name == bind.name) {
            return Err(StaticError::new(
                format!("duplicate local binding: {}", bind.name),
                bind.location.clone(),
            ));
        }
    }
    Ok(())
}
