use std::fmt::Write;

use crate::ast::Expr;

/// Renders the AST back as canonical source text. Every compound
/// subexpression is parenthesized, so the output re-parses to the same
/// tree regardless of the precedence of the original input.
pub fn unparse(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Null(_) => out.push_str("null"),
        Expr::Boolean(value, _) => {
            let _ = write!(out, "{}", value);
        }
        Expr::Number(value, _) => {
            let _ = write!(out, "{}", value);
        }
        Expr::Str(value, _) => write_string_literal(out, value),
        Expr::Var(name, _) => out.push_str(name),
        Expr::Array(elements, _) => {
            out.push('[');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, element);
            }
            out.push(']');
        }
        Expr::Local { binds, body, .. } => {
            out.push_str("local ");
            for (i, bind) in binds.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&bind.name);
                out.push_str(" = ");
                write_expr(out, &bind.value);
            }
            out.push_str("; ");
            write_expr(out, body);
        }
        Expr::Function(def, _) => {
            out.push_str("function(");
            for (i, param) in def.params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(param);
            }
            out.push_str(") ");
            write_expr(out, &def.body);
        }
        Expr::Call { callee, args, .. } => {
            write_operand(out, callee);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg);
            }
            out.push(')');
        }
        Expr::Index { target, index, .. } => {
            write_operand(out, target);
            out.push('[');
            write_expr(out, index);
            out.push(']');
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            out.push_str("if ");
            write_expr(out, cond);
            out.push_str(" then ");
            write_expr(out, then_branch);
            if let Some(else_branch) = else_branch {
                out.push_str(" else ");
                write_expr(out, else_branch);
            }
        }
        Expr::Unary { op, operand, .. } => {
            out.push_str(op.symbol());
            write_operand(out, operand);
        }
        Expr::Binary {
            op, left, right, ..
        } => {
            out.push('(');
            write_expr(out, left);
            let _ = write!(out, " {} ", op.symbol());
            write_expr(out, right);
            out.push(')');
        }
        Expr::ErrorExpr { operand, .. } => {
            out.push_str("error ");
            write_expr(out, operand);
        }
    }
}

/// Like `write_expr` but wraps anything that isn't already atomic or
/// self-delimiting in parentheses.
fn write_operand(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Null(_)
        | Expr::Boolean(..)
        | Expr::Number(..)
        | Expr::Str(..)
        | Expr::Var(..)
        | Expr::Array(..)
        | Expr::Call { .. }
        | Expr::Index { .. }
        | Expr::Binary { .. } => write_expr(out, expr),
        _ => {
            out.push('(');
            write_expr(out, expr);
            out.push(')');
        }
    }
}

pub fn write_string_literal(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}
