//! Reference stack machine for running classes before and after weaving
//!
//! Values are tracked slot by slot (`long` and `double` are followed by a `Top` slot), and every
//! frame is held to its method's `max_stack` and `max_locals`. The runtime support types, the
//! boxes and a `probe/Probe` class with observable side effects are built in.

#![allow(dead_code)]

use std::collections::HashMap;
use weaver::bytecode::code::{
    opcodes, Condition, Constant, FieldAccess, Instruction, InstructionStream, InvokeKind, LabelId,
    MethodRef, RawInstruction,
};
use weaver::bytecode::model::{ClassDefinition, MethodBody};
use weaver::bytecode::{
    BinaryName, MethodAccessFlags, Name, ParseDescriptor, RefType, Signature, UnqualifiedName,
    ValueKind, ValueType,
};
use weaver::util::Width;
use weaver::weave::{Directive, DirectiveKind, HandlerReference, MethodSelector, Settings};

/// Steps a single top-level call may take
const FUEL: usize = 100_000;

/// Contents of one stack or local slot
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(Option<usize>),

    /// Upper half of a `long` or `double`
    Top,
}

impl Value {
    pub const NULL: Value = Value::Ref(None);

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Int(_) => Some(ValueKind::Int),
            Value::Long(_) => Some(ValueKind::Long),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Double(_) => Some(ValueKind::Double),
            Value::Ref(_) => Some(ValueKind::Reference),
            Value::Top => None,
        }
    }

    fn is_wide(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    pub fn zero(kind: ValueKind) -> Value {
        match kind {
            ValueKind::Int => Value::Int(0),
            ValueKind::Long => Value::Long(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Double => Value::Double(0.0),
            ValueKind::Reference => Value::NULL,
        }
    }

    /// Numeric conversion, as done by the unboxing methods
    fn convert(self, kind: ValueKind) -> Result<Value, Trap> {
        let (integral, floating) = match self {
            Value::Int(i) => (i as i64, i as f64),
            Value::Long(l) => (l, l as f64),
            Value::Float(x) => (x as i64, x as f64),
            Value::Double(x) => (x as i64, x),
            other => return Err(Trap::BadValue(format!("{:?} is not a number", other))),
        };
        Ok(match kind {
            ValueKind::Int => Value::Int(integral as i32),
            ValueKind::Long => Value::Long(integral),
            ValueKind::Float => Value::Float(floating as f32),
            ValueKind::Double => Value::Double(floating),
            ValueKind::Reference => return Err(Trap::BadValue(String::from("unbox to reference"))),
        })
    }
}

/// Something on the heap
#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    Str(String),
    Boxed {
        class: BinaryName,
        value: Value,
    },
    Token {
        class: BinaryName,
        method: String,
        cancellable: bool,
        cancelled: bool,
        return_value: Value,
    },
    View(Vec<Value>),
    Instance {
        class: BinaryName,
        fields: HashMap<String, Value>,
    },

    /// Allocated by `new`, not yet constructed
    Blank(BinaryName),
}

/// Ways a run can go wrong
#[derive(Clone, Debug, PartialEq)]
pub enum Trap {
    StackOverflow { method: String, depth: usize },
    StackUnderflow(String),
    LocalsOverflow { method: String, slot: u16 },
    UninitializedLocal { method: String, slot: u16 },
    BadValue(String),
    ClassCast(String),
    NoSuchMethod(String),
    UndefinedLabel(LabelId),
    NullPointer,
    NotCancellable(String),
    Thrown,
    FellOffEnd(String),
    OutOfFuel,
}

struct Frame {
    method: String,
    stack: Vec<Value>,
    max_stack: usize,
    locals: Vec<Option<Value>>,
}

impl Frame {
    fn new(method: String, max_stack: u16, max_locals: u16) -> Frame {
        Frame {
            method,
            stack: vec![],
            max_stack: max_stack as usize,
            locals: vec![None; max_locals as usize],
        }
    }

    fn push_slot(&mut self, value: Value) -> Result<(), Trap> {
        if self.stack.len() >= self.max_stack {
            return Err(Trap::StackOverflow {
                method: self.method.clone(),
                depth: self.stack.len() + 1,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn push(&mut self, value: Value) -> Result<(), Trap> {
        self.push_slot(value)?;
        if value.is_wide() {
            self.push_slot(Value::Top)?;
        }
        Ok(())
    }

    fn pop_slot(&mut self) -> Result<Value, Trap> {
        self.stack
            .pop()
            .ok_or_else(|| Trap::StackUnderflow(self.method.clone()))
    }

    fn pop(&mut self, kind: ValueKind) -> Result<Value, Trap> {
        if kind.width() == 2 && self.pop_slot()? != Value::Top {
            return Err(Trap::BadValue(format!("{}: torn {:?}", self.method, kind)));
        }
        let value = self.pop_slot()?;
        if value.kind() != Some(kind) {
            return Err(Trap::BadValue(format!(
                "{}: expected {:?}, found {:?}",
                self.method, kind, value
            )));
        }
        Ok(value)
    }

    fn load(&self, slot: u16, kind: ValueKind) -> Result<Value, Trap> {
        if slot as usize + kind.width() > self.locals.len() {
            return Err(Trap::LocalsOverflow {
                method: self.method.clone(),
                slot,
            });
        }
        match self.locals[slot as usize] {
            Some(value) if value.kind() == Some(kind) => Ok(value),
            Some(value) => Err(Trap::BadValue(format!(
                "{}: local {} holds {:?}, not {:?}",
                self.method, slot, value, kind
            ))),
            None => Err(Trap::UninitializedLocal {
                method: self.method.clone(),
                slot,
            }),
        }
    }

    fn store(&mut self, slot: u16, value: Value) -> Result<(), Trap> {
        let width = if value.is_wide() { 2 } else { 1 };
        if slot as usize + width > self.locals.len() {
            return Err(Trap::LocalsOverflow {
                method: self.method.clone(),
                slot,
            });
        }
        self.locals[slot as usize] = Some(value);
        if width == 2 {
            self.locals[slot as usize + 1] = Some(Value::Top);
        }
        Ok(())
    }
}

/// Interpreter over a set of classes
pub struct Machine {
    classes: HashMap<BinaryName, ClassDefinition>,
    settings: Settings,
    pub heap: Vec<Object>,
    pub statics: HashMap<String, Value>,

    /// Calls to `probe/Probe.hit()V`
    pub probes: usize,

    /// Arguments passed to `probe/Probe.record`
    pub recorded: Vec<Value>,

    fuel: usize,
}

impl Machine {
    pub fn new(classes: impl IntoIterator<Item = ClassDefinition>) -> Machine {
        Machine {
            classes: classes
                .into_iter()
                .map(|class| (class.name.clone(), class))
                .collect(),
            settings: Settings::new(),
            heap: vec![],
            statics: HashMap::new(),
            probes: 0,
            recorded: vec![],
            fuel: 0,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Machine {
        self.settings = settings;
        self
    }

    pub fn alloc(&mut self, object: Object) -> Value {
        self.heap.push(object);
        Value::Ref(Some(self.heap.len() - 1))
    }

    pub fn string(&mut self, text: &str) -> Value {
        self.alloc(Object::Str(String::from(text)))
    }

    pub fn object(&self, value: Value) -> Result<&Object, Trap> {
        match value {
            Value::Ref(Some(index)) => Ok(&self.heap[index]),
            Value::Ref(None) => Err(Trap::NullPointer),
            other => Err(Trap::BadValue(format!("{:?} is not a reference", other))),
        }
    }

    fn object_mut(&mut self, value: Value) -> Result<&mut Object, Trap> {
        match value {
            Value::Ref(Some(index)) => Ok(&mut self.heap[index]),
            Value::Ref(None) => Err(Trap::NullPointer),
            other => Err(Trap::BadValue(format!("{:?} is not a reference", other))),
        }
    }

    /// Call a static method
    pub fn call_static(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        args: &[Value],
    ) -> Result<Option<Value>, Trap> {
        self.fuel = FUEL;
        let method = method_ref(class, name, descriptor);
        self.invoke(InvokeKind::Static, &method, None, args.to_vec())
    }

    /// Call an instance method on a fresh instance of its class
    pub fn call_virtual(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        args: &[Value],
    ) -> Result<Option<Value>, Trap> {
        self.fuel = FUEL;
        let receiver = self.alloc(Object::Blank(binary_name(class)));
        let init = method_ref(class, "<init>", "()V");
        self.invoke(InvokeKind::Special, &init, Some(receiver), vec![])?;
        let method = method_ref(class, name, descriptor);
        self.invoke(InvokeKind::Virtual, &method, Some(receiver), args.to_vec())
    }

    fn invoke(
        &mut self,
        kind: InvokeKind,
        method: &MethodRef,
        receiver: Option<Value>,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Trap> {
        if let Some(result) = self.intrinsic(method, receiver, &args)? {
            return Ok(result);
        }

        let mut owner = method.owner.clone();
        if let Some(receiver) = receiver {
            let object = self.object_mut(receiver)?;
            match object {
                Object::Blank(class) if method.name == UnqualifiedName::INIT => {
                    let class = class.clone();
                    *object = Object::Instance {
                        class,
                        fields: HashMap::new(),
                    };
                }
                Object::Instance { class, .. } if kind != InvokeKind::Special => {
                    owner = class.clone();
                }
                _ => (),
            }
        }

        let body = self
            .classes
            .get(&owner)
            .and_then(|class| class.method(&method.name, &method.descriptor))
            .cloned();
        match body {
            Some(body) => {
                if body.is_static() != (kind == InvokeKind::Static) {
                    return Err(Trap::BadValue(format!(
                        "{:?} of {}",
                        kind,
                        method.identity()
                    )));
                }
                let locals = receiver.into_iter().chain(args).collect();
                self.execute(&owner, &body, locals)
            }

            // Classes without an explicit constructor still have the default one
            None if method.name == UnqualifiedName::INIT && method.descriptor.parameters.is_empty() => {
                Ok(None)
            }
            None => Err(Trap::NoSuchMethod(method.identity())),
        }
    }

    /// Built in methods (`None` when the method is not one of them)
    fn intrinsic(
        &mut self,
        method: &MethodRef,
        receiver: Option<Value>,
        args: &[Value],
    ) -> Result<Option<Option<Value>>, Trap> {
        let owner = &method.owner;
        let name = method.name.as_str();

        if owner == &BinaryName::OBJECT && name == "<init>" {
            return Ok(Some(None));
        }

        if is_box(owner) {
            if name == "valueOf" {
                let value = args[0];
                return Ok(Some(Some(self.alloc(Object::Boxed {
                    class: owner.clone(),
                    value,
                }))));
            }
            if name.ends_with("Value") {
                let receiver = receiver.ok_or(Trap::NullPointer)?;
                let value = match self.object(receiver)? {
                    Object::Boxed { value, .. } => *value,
                    other => return Err(Trap::ClassCast(format!("{:?} is not a box", other))),
                };
                let kind = method
                    .descriptor
                    .return_kind()
                    .ok_or_else(|| Trap::NoSuchMethod(method.identity()))?;
                return Ok(Some(Some(value.convert(kind)?)));
            }
        }

        if self.settings.is_token(owner) {
            let receiver = receiver.ok_or(Trap::NullPointer)?;
            return match name {
                "<init>" => {
                    let method_name = match self.object(args[0])? {
                        Object::Str(text) => text.clone(),
                        other => return Err(Trap::BadValue(format!("token name {:?}", other))),
                    };
                    let cancellable = args[1] != Value::Int(0);
                    let return_value = args.get(2).copied().unwrap_or(Value::NULL);
                    *self.object_mut(receiver)? = Object::Token {
                        class: owner.clone(),
                        method: method_name,
                        cancellable,
                        cancelled: false,
                        return_value,
                    };
                    Ok(Some(None))
                }
                "isCancelled" => match self.object(receiver)? {
                    Object::Token { cancelled, .. } => Ok(Some(Some(Value::Int(*cancelled as i32)))),
                    other => Err(Trap::ClassCast(format!("{:?} is not a token", other))),
                },
                "getReturnValue" => match self.object(receiver)? {
                    Object::Token { return_value, .. } => Ok(Some(Some(*return_value))),
                    other => Err(Trap::ClassCast(format!("{:?} is not a token", other))),
                },
                "cancel" | "setReturnValue" => match self.object_mut(receiver)? {
                    Object::Token {
                        method,
                        cancellable,
                        cancelled,
                        return_value,
                        ..
                    } => {
                        if !*cancellable {
                            return Err(Trap::NotCancellable(method.clone()));
                        }
                        *cancelled = true;
                        if let Some(value) = args.first() {
                            *return_value = *value;
                        }
                        Ok(Some(None))
                    }
                    other => Err(Trap::ClassCast(format!("{:?} is not a token", other))),
                },
                _ => Err(Trap::NoSuchMethod(method.identity())),
            };
        }

        if owner == &self.settings.argument_view {
            let receiver = receiver.ok_or(Trap::NullPointer)?;
            let index = match args.first() {
                Some(Value::Int(index)) => *index as usize,
                other => return Err(Trap::BadValue(format!("view index {:?}", other))),
            };
            return match (name, self.object_mut(receiver)?) {
                ("<init>", object) => {
                    *object = Object::View(vec![Value::NULL; index]);
                    Ok(Some(None))
                }
                ("get", Object::View(values)) => values
                    .get(index)
                    .map(|value| Some(Some(*value)))
                    .ok_or_else(|| Trap::BadValue(format!("view index {}", index))),
                ("set", Object::View(values)) => {
                    let slot = values
                        .get_mut(index)
                        .ok_or_else(|| Trap::BadValue(format!("view index {}", index)))?;
                    *slot = args[1];
                    Ok(Some(None))
                }
                _ => Err(Trap::NoSuchMethod(method.identity())),
            };
        }

        if owner.as_str() == "probe/Probe" {
            match name {
                "hit" => self.probes += 1,
                "record" => self.recorded.extend(args.iter().copied()),
                _ => return Err(Trap::NoSuchMethod(method.identity())),
            }
            return Ok(Some(None));
        }

        Ok(None)
    }

    fn instance_of(&self, object: &Object, class: &BinaryName) -> bool {
        if class == &BinaryName::OBJECT {
            return true;
        }
        match object {
            Object::Str(_) => class == &BinaryName::STRING,
            Object::Boxed { class: boxed, .. } => {
                boxed == class
                    || (class == &BinaryName::NUMBER
                        && boxed != &BinaryName::BOOLEAN
                        && boxed != &BinaryName::CHARACTER)
            }
            Object::Token { class: token, .. } => token == class,
            Object::View(_) => class == &self.settings.argument_view,
            Object::Instance { class: actual, .. } => {
                let mut current = Some(actual);
                while let Some(name) = current {
                    if name == class {
                        return true;
                    }
                    current = self.classes.get(name).map(|def| &def.super_name);
                    if current == Some(&BinaryName::OBJECT) {
                        break;
                    }
                }
                false
            }
            Object::Blank(_) => false,
        }
    }

    fn execute(
        &mut self,
        owner: &BinaryName,
        method: &MethodBody,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Trap> {
        let code = method.instructions.to_vec();
        let labels: HashMap<LabelId, usize> = code
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| match instruction {
                Instruction::Label(label) => Some((*label, index)),
                _ => None,
            })
            .collect();

        let mut frame = Frame::new(
            format!("{}.{}", owner, method.identity()),
            method.max_stack,
            method.max_locals,
        );
        let mut slot = 0;
        for arg in args {
            frame.store(slot, arg)?;
            slot += if arg.is_wide() { 2 } else { 1 };
        }

        let mut pc = 0;
        loop {
            self.fuel = self.fuel.checked_sub(1).ok_or(Trap::OutOfFuel)?;
            let instruction = code
                .get(pc)
                .ok_or_else(|| Trap::FellOffEnd(frame.method.clone()))?;
            pc += 1;

            match instruction {
                Instruction::PushConstant(constant) => {
                    let value = match constant {
                        Constant::Null => Value::NULL,
                        Constant::Int(i) => Value::Int(*i),
                        Constant::Long(l) => Value::Long(*l),
                        Constant::Float(x) => Value::Float(*x),
                        Constant::Double(x) => Value::Double(*x),
                        Constant::String(text) => self.string(text),
                    };
                    frame.push(value)?;
                }
                Instruction::LoadLocal(slot, kind) => {
                    let value = frame.load(*slot, *kind)?;
                    frame.push(value)?;
                }
                Instruction::StoreLocal(slot, kind) => {
                    let value = frame.pop(*kind)?;
                    frame.store(*slot, value)?;
                }
                Instruction::Invoke(kind, called) => {
                    let mut args = vec![];
                    for param in called.descriptor.parameters.iter().rev() {
                        args.push(frame.pop(param.value_kind())?);
                    }
                    args.reverse();
                    let receiver = match kind {
                        InvokeKind::Static => None,
                        _ => Some(frame.pop(ValueKind::Reference)?),
                    };
                    let result = self.invoke(*kind, called, receiver, args)?;
                    match (result, called.descriptor.return_kind()) {
                        (Some(value), Some(kind)) if value.kind() == Some(kind) => frame.push(value)?,
                        (None, None) => (),
                        (result, _) => {
                            return Err(Trap::BadValue(format!(
                                "{} returned {:?}",
                                called.identity(),
                                result
                            )))
                        }
                    }
                }
                Instruction::Field(access, field) => {
                    let kind = field.descriptor.value_kind();
                    let key = field.identity();
                    match access {
                        FieldAccess::GetStatic => {
                            let value = self.statics.get(&key).copied().unwrap_or(Value::zero(kind));
                            frame.push(value)?;
                        }
                        FieldAccess::PutStatic => {
                            let value = frame.pop(kind)?;
                            self.statics.insert(key, value);
                        }
                        FieldAccess::GetField => {
                            let receiver = frame.pop(ValueKind::Reference)?;
                            let value = match self.object(receiver)? {
                                Object::Instance { fields, .. } => {
                                    fields.get(&key).copied().unwrap_or(Value::zero(kind))
                                }
                                other => return Err(Trap::BadValue(format!("getfield on {:?}", other))),
                            };
                            frame.push(value)?;
                        }
                        FieldAccess::PutField => {
                            let value = frame.pop(kind)?;
                            let receiver = frame.pop(ValueKind::Reference)?;
                            match self.object_mut(receiver)? {
                                Object::Instance { fields, .. } => {
                                    fields.insert(key, value);
                                }
                                other => return Err(Trap::BadValue(format!("putfield on {:?}", other))),
                            }
                        }
                    }
                }
                Instruction::New(class) => {
                    let value = self.alloc(Object::Blank(class.clone()));
                    frame.push(value)?;
                }
                Instruction::CheckCast(ref_type) => {
                    let value = frame.pop(ValueKind::Reference)?;
                    if value != Value::NULL {
                        let class = match ref_type {
                            RefType::Object(class) => class,
                            _ => return Err(Trap::BadValue(String::from("array cast"))),
                        };
                        let object = self.object(value)?;
                        if !self.instance_of(object, class) {
                            return Err(Trap::ClassCast(format!("{:?} to {}", object, class)));
                        }
                    }
                    frame.push(value)?;
                }
                Instruction::Dup => {
                    let value = frame.pop_slot()?;
                    frame.push_slot(value)?;
                    frame.push_slot(value)?;
                }
                Instruction::DupX1 => {
                    let value1 = frame.pop_slot()?;
                    let value2 = frame.pop_slot()?;
                    for value in [value1, value2, value1] {
                        frame.push_slot(value)?;
                    }
                }
                Instruction::DupX2 => {
                    let value1 = frame.pop_slot()?;
                    let value2 = frame.pop_slot()?;
                    let value3 = frame.pop_slot()?;
                    for value in [value1, value3, value2, value1] {
                        frame.push_slot(value)?;
                    }
                }
                Instruction::Swap => {
                    let value1 = frame.pop_slot()?;
                    let value2 = frame.pop_slot()?;
                    frame.push_slot(value1)?;
                    frame.push_slot(value2)?;
                }
                Instruction::Pop => {
                    frame.pop_slot()?;
                }
                Instruction::Pop2 => {
                    frame.pop_slot()?;
                    frame.pop_slot()?;
                }
                Instruction::Branch(condition, label) => {
                    let taken = match condition {
                        Condition::Always => true,
                        Condition::IfNull => frame.pop(ValueKind::Reference)? == Value::NULL,
                        Condition::IfNonNull => frame.pop(ValueKind::Reference)? != Value::NULL,
                        _ => {
                            let value = match frame.pop(ValueKind::Int)? {
                                Value::Int(i) => i,
                                _ => unreachable!(),
                            };
                            match condition {
                                Condition::IfZero => value == 0,
                                Condition::IfNonZero => value != 0,
                                Condition::IfNegative => value < 0,
                                Condition::IfNonNegative => value >= 0,
                                Condition::IfPositive => value > 0,
                                _ => value <= 0,
                            }
                        }
                    };
                    if taken {
                        pc = *labels.get(label).ok_or(Trap::UndefinedLabel(*label))?;
                    }
                }
                Instruction::Return(None) => return Ok(None),
                Instruction::Return(Some(kind)) => return frame.pop(*kind).map(Some),
                Instruction::Label(_) => (),
                Instruction::Raw(raw) => self.execute_raw(&mut frame, raw)?,
            }
        }
    }

    fn execute_raw(&mut self, frame: &mut Frame, raw: &RawInstruction) -> Result<(), Trap> {
        fn int(value: Value) -> i32 {
            match value {
                Value::Int(i) => i,
                _ => unreachable!(),
            }
        }
        fn long(value: Value) -> i64 {
            match value {
                Value::Long(l) => l,
                _ => unreachable!(),
            }
        }

        let result = match raw.opcode {
            opcodes::NOP => return Ok(()),
            opcodes::ATHROW => return Err(Trap::Thrown),
            opcodes::BIPUSH => Value::Int(raw.operand_i8(0).unwrap_or(0) as i32),
            opcodes::SIPUSH => Value::Int(raw.operand_i16(0).unwrap_or(0) as i32),
            opcodes::IINC => {
                let slot = raw.operands.first().copied().unwrap_or(0) as u16;
                let by = raw.operand_i8(1).unwrap_or(0) as i32;
                let value = int(frame.load(slot, ValueKind::Int)?);
                return frame.store(slot, Value::Int(value.wrapping_add(by)));
            }
            opcodes::IADD | opcodes::ISUB | opcodes::IMUL => {
                let rhs = int(frame.pop(ValueKind::Int)?);
                let lhs = int(frame.pop(ValueKind::Int)?);
                Value::Int(match raw.opcode {
                    opcodes::IADD => lhs.wrapping_add(rhs),
                    opcodes::ISUB => lhs.wrapping_sub(rhs),
                    _ => lhs.wrapping_mul(rhs),
                })
            }
            opcodes::LADD | opcodes::LSUB | opcodes::LMUL => {
                let rhs = long(frame.pop(ValueKind::Long)?);
                let lhs = long(frame.pop(ValueKind::Long)?);
                Value::Long(match raw.opcode {
                    opcodes::LADD => lhs.wrapping_add(rhs),
                    opcodes::LSUB => lhs.wrapping_sub(rhs),
                    _ => lhs.wrapping_mul(rhs),
                })
            }
            opcodes::DADD => match (frame.pop(ValueKind::Double)?, frame.pop(ValueKind::Double)?) {
                (Value::Double(rhs), Value::Double(lhs)) => Value::Double(lhs + rhs),
                _ => unreachable!(),
            },
            opcodes::I2L => frame.pop(ValueKind::Int)?.convert(ValueKind::Long)?,
            opcodes::I2F => frame.pop(ValueKind::Int)?.convert(ValueKind::Float)?,
            opcodes::I2D => frame.pop(ValueKind::Int)?.convert(ValueKind::Double)?,
            opcodes::L2F => frame.pop(ValueKind::Long)?.convert(ValueKind::Float)?,
            opcodes::L2D => frame.pop(ValueKind::Long)?.convert(ValueKind::Double)?,
            opcodes::F2D => frame.pop(ValueKind::Float)?.convert(ValueKind::Double)?,
            other => return Err(Trap::BadValue(format!("opcode 0x{:02x}", other))),
        };
        frame.push(result)
    }
}

fn is_box(class: &BinaryName) -> bool {
    [
        BinaryName::BOOLEAN,
        BinaryName::BYTE,
        BinaryName::CHARACTER,
        BinaryName::DOUBLE,
        BinaryName::FLOAT,
        BinaryName::INTEGER,
        BinaryName::LONG,
        BinaryName::SHORT,
        BinaryName::NUMBER,
    ]
    .contains(class)
}

// Builders for test classes

pub fn binary_name(text: &str) -> BinaryName {
    BinaryName::from_string(String::from(text)).unwrap()
}

pub fn unqualified_name(text: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(String::from(text)).unwrap()
}

pub fn signature(text: &str) -> Signature {
    Signature::parse(text).unwrap()
}

pub fn value_type(text: &str) -> ValueType {
    ValueType::parse(text).unwrap()
}

pub fn method_ref(owner: &str, name: &str, descriptor: &str) -> MethodRef {
    MethodRef {
        owner: binary_name(owner),
        name: unqualified_name(name),
        descriptor: signature(descriptor),
    }
}

pub fn invoke_static(owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::Invoke(InvokeKind::Static, method_ref(owner, name, descriptor))
}

pub fn invoke_virtual(owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::Invoke(InvokeKind::Virtual, method_ref(owner, name, descriptor))
}

pub fn invoke_special(owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::Invoke(InvokeKind::Special, method_ref(owner, name, descriptor))
}

pub fn push_int(value: i32) -> Instruction {
    Instruction::PushConstant(Constant::Int(value))
}

pub fn raw(opcode: u8, pops: u8, pushes: u8) -> Instruction {
    Instruction::Raw(RawInstruction::simple(opcode, pops, pushes))
}

pub fn probe_hit() -> Instruction {
    invoke_static("probe/Probe", "hit", "()V")
}

pub const STATIC: MethodAccessFlags = MethodAccessFlags::from_bits_truncate(
    MethodAccessFlags::PUBLIC.bits() | MethodAccessFlags::STATIC.bits(),
);
pub const INSTANCE: MethodAccessFlags = MethodAccessFlags::PUBLIC;

/// Method with bounds computed from its code
pub fn method(
    name: &str,
    descriptor: &str,
    access_flags: MethodAccessFlags,
    code: Vec<Instruction>,
) -> MethodBody {
    let instructions: InstructionStream = code.into_iter().collect();
    MethodBody::new(
        unqualified_name(name),
        signature(descriptor),
        access_flags,
        instructions,
    )
    .unwrap()
}

pub fn class(name: &str, methods: Vec<MethodBody>) -> ClassDefinition {
    let mut class = ClassDefinition::new(binary_name(name));
    for method in methods {
        class.add_method(method).unwrap();
    }
    class
}

pub fn handler(owner: &str, name: &str, descriptor: &str) -> HandlerReference {
    HandlerReference {
        owner: binary_name(owner),
        name: unqualified_name(name),
        descriptor: signature(descriptor),
    }
}

/// Directive against every overload of a method, at the default priority
pub fn directive(
    target_class: &str,
    target_method: &str,
    handler: HandlerReference,
    kind: DirectiveKind,
) -> Directive {
    Directive {
        target_class: binary_name(target_class),
        target: MethodSelector {
            name: unqualified_name(target_method),
            descriptor: None,
        },
        handler,
        priority: Settings::new().default_priority,
        required: false,
        kind,
    }
}
