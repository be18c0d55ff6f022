use std::{sync::Arc, thread};

use crate::{
    ast::{BinaryOp, Expr, FunctionDef, Location, UnaryOp},
    error::{RuntimeError, StackFrame},
    unparser::write_string_literal,
};

/// Evaluation limits, matching the driver's CLI defaults.
#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    /// Maximum number of in-flight function calls.
    pub max_stack: usize,
    /// Do not run the garbage collector below this many live environments.
    pub gc_min_objects: usize,
    /// Run the garbage collector once the live count exceeds the survivor
    /// count of the previous collection by this factor.
    pub gc_growth_trigger: f64,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            max_stack: 500,
            gc_min_objects: 1000,
            gc_growth_trigger: 2.0,
        }
    }
}

/// Native stack budget for the evaluation thread: a fixed base plus a
/// per-language-frame allowance. Each language call costs several native
/// frames (call, binary, index dispatch), so the allowance is generous.
const NATIVE_STACK_BASE_BYTES: usize = 1024 * 1024;
const NATIVE_STACK_BYTES_PER_FRAME: usize = 128 * 1024;

type EnvId = usize;

#[derive(Debug, Clone)]
pub struct Closure {
    def: Arc<FunctionDef>,
    env: EnvId,
    name: Option<Arc<str>>,
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    Str(Arc<str>),
    Array(Arc<Vec<Value>>),
    Closure(Closure),
    /// Placeholder for a `local` binding whose value expression has not
    /// been evaluated yet. Never escapes evaluation.
    Uninitialized,
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Closure(_) => "function",
            Value::Uninitialized => "uninitialized",
        }
    }
}

struct EnvData {
    bindings: Vec<(Arc<str>, Value)>,
    parent: Option<EnvId>,
    marked: bool,
}

/// A slab of environments with a free list. Environments are the only
/// heap-managed objects; everything else is structurally shared via `Arc`.
/// Closures point back into the slab, which is what makes `local`
/// recursion cyclic and reference counting insufficient.
struct Heap {
    slots: Vec<Option<EnvData>>,
    free: Vec<EnvId>,
    live: usize,
    last_survivors: usize,
    min_objects: usize,
    growth_trigger: f64,
    collections: usize,
}

impl Heap {
    fn new(min_objects: usize, growth_trigger: f64) -> Self {
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            last_survivors: 0,
            min_objects,
            growth_trigger,
            collections: 0,
        }
    }

    fn should_collect(&self) -> bool {
        self.live > self.min_objects
            && (self.live as f64) > (self.last_survivors as f64) * self.growth_trigger
    }

    fn alloc(&mut self, parent: Option<EnvId>) -> EnvId {
        let data = EnvData {
            bindings: Vec::new(),
            parent,
            marked: false,
        };
        self.live += 1;
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(data);
                id
            }
            None => {
                self.slots.push(Some(data));
                self.slots.len() - 1
            }
        }
    }

    fn get(&self, id: EnvId) -> &EnvData {
        self.slots[id]
            .as_ref()
            .expect("environment id points at a collected slot")
    }

    fn define(&mut self, id: EnvId, name: Arc<str>, value: Value) {
        let env = self.slots[id]
            .as_mut()
            .expect("environment id points at a collected slot");
        env.bindings.push((name, value));
    }

    fn set_by_index(&mut self, id: EnvId, index: usize, value: Value) {
        let env = self.slots[id]
            .as_mut()
            .expect("environment id points at a collected slot");
        env.bindings[index].1 = value;
    }

    fn lookup(&self, mut id: EnvId, name: &str) -> Option<Value> {
        loop {
            let env = self.get(id);
            if let Some((_, value)) = env.bindings.iter().rev().find(|(bound, _)| &**bound == name)
            {
                return Some(value.clone());
            }
            match env.parent {
                Some(parent) => id = parent,
                None => return None,
            }
        }
    }

    fn mark_env(&mut self, id: EnvId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let env = self.slots[id]
                .as_mut()
                .expect("marking reached a collected slot");
            if env.marked {
                continue;
            }
            env.marked = true;
            if let Some(parent) = env.parent {
                pending.push(parent);
            }
            for (_, value) in &env.bindings {
                push_value_envs(value, &mut pending);
            }
        }
    }

    fn sweep(&mut self) {
        let mut survivors = 0;
        for (id, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Some(env) if env.marked => {
                    env.marked = false;
                    survivors += 1;
                }
                Some(_) => {
                    *slot = None;
                    self.free.push(id);
                }
                None => {}
            }
        }
        self.live = survivors;
        self.last_survivors = survivors;
        self.collections += 1;
    }
}

fn push_value_envs(value: &Value, pending: &mut Vec<EnvId>) {
    match value {
        Value::Closure(closure) => pending.push(closure.env),
        Value::Array(elements) => {
            for element in elements.iter() {
                push_value_envs(element, pending);
            }
        }
        _ => {}
    }
}

struct Frame {
    location: Location,
    name: String,
    env: EnvId,
}

pub struct Interpreter {
    heap: Heap,
    stack: Vec<Frame>,
    /// Environments the evaluator is holding on the native stack that are
    /// not (yet) reachable from a call frame.
    env_roots: Vec<EnvId>,
    /// Intermediate values the evaluator is holding on the native stack
    /// (evaluated callees, arguments, array elements) that may keep
    /// otherwise-unreachable environments alive.
    value_roots: Vec<Value>,
    options: EvalOptions,
}

impl Interpreter {
    pub fn new(options: EvalOptions) -> Self {
        Interpreter {
            heap: Heap::new(options.gc_min_objects, options.gc_growth_trigger),
            stack: Vec::new(),
            env_roots: Vec::new(),
            value_roots: Vec::new(),
            options,
        }
    }

    /// Evaluates the program and manifests the result as literal syntax.
    ///
    /// Evaluation recurses on the native stack, so the work happens on a
    /// dedicated thread whose stack is sized to fit `max_stack` language
    /// frames. The main thread's stack is out of our control and a deep
    /// but legal program must not abort the process.
    pub fn run(&mut self, expr: &Expr) -> Result<String, RuntimeError> {
        let stack_size = NATIVE_STACK_BASE_BYTES.saturating_add(
            self.options
                .max_stack
                .saturating_mul(NATIVE_STACK_BYTES_PER_FRAME),
        );
        thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name("veld-eval".to_string())
                .stack_size(stack_size)
                .spawn_scoped(scope, || self.run_on_current_thread(expr));
            match handle {
                Ok(handle) => handle.join().expect("evaluation thread panicked"),
                Err(err) => Err(RuntimeError::new(
                    format!("couldn't spawn evaluation thread: {}", err),
                    Vec::new(),
                )),
            }
        })
    }

    fn run_on_current_thread(&mut self, expr: &Expr) -> Result<String, RuntimeError> {
        let root = self.alloc_env(None);
        self.env_roots.push(root);
        let result = self.eval(expr, root);
        self.env_roots.pop();
        let value = result?;
        self.manifest(&value)
    }

    /// How many times the garbage collector has run.
    pub fn gc_collections(&self) -> usize {
        self.heap.collections
    }

    fn alloc_env(&mut self, parent: Option<EnvId>) -> EnvId {
        if self.heap.should_collect() {
            self.collect();
        }
        self.heap.alloc(parent)
    }

    fn collect(&mut self) {
        for frame in &self.stack {
            self.heap.mark_env(frame.env);
        }
        for i in 0..self.env_roots.len() {
            let id = self.env_roots[i];
            self.heap.mark_env(id);
        }
        let mut pending: Vec<EnvId> = Vec::new();
        for value in &self.value_roots {
            push_value_envs(value, &mut pending);
        }
        for id in pending {
            self.heap.mark_env(id);
        }
        self.heap.sweep();
    }

    fn error<T: Into<String>>(&self, message: T) -> RuntimeError {
        let stack = self
            .stack
            .iter()
            .map(|frame| StackFrame::new(frame.location.to_string(), frame.name.clone()))
            .collect();
        RuntimeError::new(message, stack)
    }

    /// Like `error`, but appends the failing expression's own location as
    /// a final, nameless frame.
    fn error_at<T: Into<String>>(&self, location: &Location, message: T) -> RuntimeError {
        let mut err = self.error(message);
        err.stack.push(StackFrame::new(location.to_string(), ""));
        err
    }

    fn eval(&mut self, expr: &Expr, env: EnvId) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Null(_) => Ok(Value::Null),
            Expr::Boolean(value, _) => Ok(Value::Boolean(*value)),
            Expr::Number(value, _) => Ok(Value::Number(*value)),
            Expr::Str(value, _) => Ok(Value::Str(value.clone())),
            Expr::Var(name, location) => match self.heap.lookup(env, name) {
                Some(Value::Uninitialized) => Err(self.error_at(
                    location,
                    format!("local \"{}\" used before its value is initialized", name),
                )),
                Some(value) => Ok(value),
                None => Err(self.error_at(location, format!("unknown variable: {}", name))),
            },
            Expr::Array(elements, _) => {
                let base = self.value_roots.len();
                let result = self.eval_array(elements, env);
                self.value_roots.truncate(base);
                result
            }
            Expr::Local { binds, body, .. } => {
                let new_env = self.alloc_env(Some(env));
                self.env_roots.push(new_env);
                let result = self.eval_local(binds, body, new_env);
                self.env_roots.pop();
                result
            }
            Expr::Function(def, _) => Ok(Value::Closure(Closure {
                def: def.clone(),
                env,
                name: None,
            })),
            Expr::Call {
                callee,
                args,
                location,
            } => {
                let base = self.value_roots.len();
                let result = self.eval_call(callee, args, env, location);
                self.value_roots.truncate(base);
                result
            }
            Expr::Index {
                target,
                index,
                location,
            } => {
                let target = self.eval(target, env)?;
                let base = self.value_roots.len();
                self.value_roots.push(target.clone());
                let result = self.eval(index, env);
                self.value_roots.truncate(base);
                let index = result?;
                self.index_value(&target, &index, location)
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => match self.eval(cond, env)? {
                Value::Boolean(true) => self.eval(then_branch, env),
                Value::Boolean(false) => match else_branch {
                    Some(else_branch) => self.eval(else_branch, env),
                    None => Ok(Value::Null),
                },
                other => Err(self.error_at(
                    cond.location(),
                    format!("condition must be a boolean, got {}", other.type_name()),
                )),
            },
            Expr::Unary {
                op,
                operand,
                location,
            } => {
                let operand = self.eval(operand, env)?;
                self.apply_unary(*op, &operand, location)
            }
            Expr::Binary {
                op,
                left,
                right,
                location,
            } => self.eval_binary(*op, left, right, env, location),
            Expr::ErrorExpr { operand, location } => {
                let value = self.eval(operand, env)?;
                let message = match &value {
                    Value::Str(text) => text.to_string(),
                    other => self.manifest(other)?,
                };
                Err(self.error_at(location, message))
            }
        }
    }

    fn eval_array(&mut self, elements: &[Expr], env: EnvId) -> Result<Value, RuntimeError> {
        let base = self.value_roots.len();
        for element in elements {
            let value = self.eval(element, env)?;
            self.value_roots.push(value);
        }
        let items = self.value_roots.split_off(base);
        Ok(Value::Array(Arc::new(items)))
    }

    fn eval_local(
        &mut self,
        binds: &[crate::ast::Bind],
        body: &Expr,
        new_env: EnvId,
    ) -> Result<Value, RuntimeError> {
        for bind in binds {
            self.heap
                .define(new_env, bind.name.clone(), Value::Uninitialized);
        }
        for (index, bind) in binds.iter().enumerate() {
            // A directly bound function literal gets the binding's name so
            // stack traces can name it, and closes over the environment
            // being built, which is what makes recursion work.
            let value = match &bind.value {
                Expr::Function(def, _) => Value::Closure(Closure {
                    def: def.clone(),
                    env: new_env,
                    name: Some(bind.name.clone()),
                }),
                other => self.eval(other, new_env)?,
            };
            self.heap.set_by_index(new_env, index, value);
        }
        self.eval(body, new_env)
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        env: EnvId,
        location: &Location,
    ) -> Result<Value, RuntimeError> {
        let callee_value = self.eval(callee, env)?;
        let closure = match callee_value {
            Value::Closure(closure) => closure,
            other => {
                return Err(self.error_at(
                    location,
                    format!("can only call functions, got {}", other.type_name()),
                ))
            }
        };
        if args.len() != closure.def.params.len() {
            return Err(self.error_at(
                location,
                format!(
                    "function expected {} argument(s), got {}",
                    closure.def.params.len(),
                    args.len()
                ),
            ));
        }
        let roots_base = self.value_roots.len();
        self.value_roots.push(Value::Closure(closure.clone()));
        let args_base = self.value_roots.len();
        for arg in args {
            let value = self.eval(arg, env)?;
            self.value_roots.push(value);
        }

        if self.stack.len() >= self.options.max_stack {
            self.value_roots.truncate(roots_base);
            return Err(self.error_at(location, "Max stack frames exceeded."));
        }

        // The allocation below may collect, so the callee and the argument
        // values stay rooted until the arguments are bound into the new
        // environment. After that the call environment's parent chain keeps
        // the closure's environment alive.
        let call_env = self.alloc_env(Some(closure.env));
        let arg_values = self.value_roots.split_off(args_base);
        for (param, value) in closure.def.params.iter().zip(arg_values) {
            self.heap.define(call_env, param.clone(), value);
        }
        self.value_roots.truncate(roots_base);
        let frame_name = match &closure.name {
            Some(name) => format!("function <{}>", name),
            None => "function <anonymous>".to_string(),
        };
        self.stack.push(Frame {
            location: location.clone(),
            name: frame_name,
            env: call_env,
        });
        let result = self.eval(&closure.def.body, call_env);
        self.stack.pop();
        result
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        env: EnvId,
        location: &Location,
    ) -> Result<Value, RuntimeError> {
        // && and || short-circuit, so the right operand is handled before
        // it is evaluated.
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let left_value = match self.eval(left, env)? {
                Value::Boolean(value) => value,
                other => {
                    return Err(self.error_at(
                        location,
                        format!(
                            "operator {} requires booleans, got {}",
                            op.symbol(),
                            other.type_name()
                        ),
                    ))
                }
            };
            match (op, left_value) {
                (BinaryOp::And, false) => return Ok(Value::Boolean(false)),
                (BinaryOp::Or, true) => return Ok(Value::Boolean(true)),
                _ => {}
            }
            return match self.eval(right, env)? {
                Value::Boolean(value) => Ok(Value::Boolean(value)),
                other => Err(self.error_at(
                    location,
                    format!(
                        "operator {} requires booleans, got {}",
                        op.symbol(),
                        other.type_name()
                    ),
                )),
            };
        }

        let left_value = self.eval(left, env)?;
        let base = self.value_roots.len();
        self.value_roots.push(left_value.clone());
        let result = self.eval(right, env);
        self.value_roots.truncate(base);
        let right_value = result?;
        self.apply_binary(op, &left_value, &right_value, location)
    }

    fn apply_binary(
        &self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
        location: &Location,
    ) -> Result<Value, RuntimeError> {
        let type_error = || {
            self.error_at(
                location,
                format!(
                    "operator {} cannot be applied to {} and {}",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ),
            )
        };
        match op {
            BinaryOp::Add => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => {
                    Ok(Value::Str(format!("{}{}", a, b).into()))
                }
                (Value::Array(a), Value::Array(b)) => {
                    let mut items = a.as_ref().clone();
                    items.extend(b.iter().cloned());
                    Ok(Value::Array(Arc::new(items)))
                }
                _ => Err(type_error()),
            },
            BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
                let (Value::Number(a), Value::Number(b)) = (left, right) else {
                    return Err(type_error());
                };
                match op {
                    BinaryOp::Subtract => Ok(Value::Number(a - b)),
                    BinaryOp::Multiply => Ok(Value::Number(a * b)),
                    BinaryOp::Divide => {
                        if *b == 0.0 {
                            Err(self.error_at(location, "division by zero"))
                        } else {
                            Ok(Value::Number(a / b))
                        }
                    }
                    BinaryOp::Modulo => {
                        if *b == 0.0 {
                            Err(self.error_at(location, "division by zero"))
                        } else {
                            Ok(Value::Number(a % b))
                        }
                    }
                    _ => unreachable!(),
                }
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let equal = self.values_equal(left, right, location)?;
                Ok(Value::Boolean(if op == BinaryOp::Equal {
                    equal
                } else {
                    !equal
                }))
            }
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(compare(op, a, b))),
                (Value::Str(a), Value::Str(b)) => {
                    Ok(Value::Boolean(compare(op, &**a, &**b)))
                }
                _ => Err(type_error()),
            },
            BinaryOp::And | BinaryOp::Or => {
                unreachable!("short-circuit operators are handled in eval_binary")
            }
        }
    }

    fn values_equal(
        &self,
        left: &Value,
        right: &Value,
        location: &Location,
    ) -> Result<bool, RuntimeError> {
        match (left, right) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a == b),
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !self.values_equal(x, y, location)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Closure(_), _) | (_, Value::Closure(_)) => {
                Err(self.error_at(location, "cannot compare functions for equality"))
            }
            _ => Ok(false),
        }
    }

    fn apply_unary(
        &self,
        op: UnaryOp,
        operand: &Value,
        location: &Location,
    ) -> Result<Value, RuntimeError> {
        match (op, operand) {
            (UnaryOp::Not, Value::Boolean(value)) => Ok(Value::Boolean(!value)),
            (UnaryOp::Negate, Value::Number(value)) => Ok(Value::Number(-value)),
            (UnaryOp::Not, other) => Err(self.error_at(
                location,
                format!("operator ! requires a boolean, got {}", other.type_name()),
            )),
            (UnaryOp::Negate, other) => Err(self.error_at(
                location,
                format!("operator - requires a number, got {}", other.type_name()),
            )),
        }
    }

    fn index_value(
        &self,
        target: &Value,
        index: &Value,
        location: &Location,
    ) -> Result<Value, RuntimeError> {
        let position = match index {
            Value::Number(value) if value.fract() == 0.0 && *value >= 0.0 => *value as usize,
            Value::Number(_) => {
                return Err(self.error_at(
                    location,
                    "index must be a non-negative integer".to_string(),
                ))
            }
            other => {
                return Err(self.error_at(
                    location,
                    format!("index must be a number, got {}", other.type_name()),
                ))
            }
        };
        match target {
            Value::Array(elements) => match elements.get(position) {
                Some(value) => Ok(value.clone()),
                None => Err(self.error_at(
                    location,
                    format!(
                        "array index {} out of bounds (length {})",
                        position,
                        elements.len()
                    ),
                )),
            },
            Value::Str(text) => match text.chars().nth(position) {
                Some(ch) => Ok(Value::Str(ch.to_string().into())),
                None => Err(self.error_at(
                    location,
                    format!(
                        "string index {} out of bounds (length {})",
                        position,
                        text.chars().count()
                    ),
                )),
            },
            other => Err(self.error_at(
                location,
                format!("can only index arrays and strings, got {}", other.type_name()),
            )),
        }
    }

    /// Renders a value as literal syntax: strings quoted and escaped,
    /// numbers in their shortest form, arrays recursively.
    fn manifest(&self, value: &Value) -> Result<String, RuntimeError> {
        let mut out = String::new();
        self.manifest_into(value, &mut out)?;
        Ok(out)
    }

    fn manifest_into(&self, value: &Value, out: &mut String) -> Result<(), RuntimeError> {
        match value {
            Value::Null => out.push_str("null"),
            Value::Boolean(true) => out.push_str("true"),
            Value::Boolean(false) => out.push_str("false"),
            Value::Number(number) => out.push_str(&number.to_string()),
            Value::Str(text) => write_string_literal(out, text),
            Value::Array(elements) => {
                out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.manifest_into(element, out)?;
                }
                out.push(']');
            }
            Value::Closure(_) => {
                return Err(self.error("couldn't manifest function in output"));
            }
            Value::Uninitialized => {
                return Err(self.error("couldn't manifest uninitialized value"));
            }
        }
        Ok(())
    }
}

fn compare<T: PartialOrd + ?Sized>(op: BinaryOp, a: &T, b: &T) -> bool {
    match op {
        BinaryOp::LessThan => a < b,
        BinaryOp::LessThanOrEqual => a <= b,
        BinaryOp::GreaterThan => a > b,
        BinaryOp::GreaterThanOrEqual => a >= b,
        _ => unreachable!("compare only handles ordering operators"),
    }
}
