//! Reference stack machine for executing compiled VM code in tests.
//!
//! Memory layout:
//!
//! - `0..5` SP, LCL, ARG, THIS, THAT
//! - `5..13` temp segment
//! - `16..256` static variables, allocated per loaded class
//! - `256..2048` stack
//! - `2048..` heap, a bump allocator that never frees
//!
//! `Math.multiply`, `Math.divide`, `Memory.alloc`, `Array.new`, `String.new`
//! and `String.appendChar` are built in. Strings are heap blocks laid out as
//! `[length, capacity, chars...]`.
#![allow(dead_code)]

use std::collections::HashMap;

const SP: usize = 0;
const LCL: usize = 1;
const ARG: usize = 2;
const THIS: usize = 3;
const THAT: usize = 4;
const TEMP: usize = 5;
const STATIC: usize = 16;
const STACK: usize = 256;
pub const HEAP: usize = 2048;
const MEMORY_SIZE: usize = 1 << 15;
const STEP_LIMIT: usize = 10_000_000;

/// Return address that stops execution.
const HALT: i16 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seg {
    Constant,
    Local,
    Argument,
    This,
    That,
    Pointer,
    Temp,
    /// Absolute address of a static variable.
    Static,
}

#[derive(Debug, Clone)]
enum Instr {
    Push(Seg, usize),
    Pop(Seg, usize),
    Op(&'static str),
    Goto(usize),
    IfGoto(usize),
    Call(String, usize),
    Function(usize),
    Return,
    /// Labels are kept so instruction indices match the source lines.
    Nop,
}

#[derive(Default)]
pub struct Machine {
    ram: Vec<i16>,
    code: Vec<Instr>,
    functions: HashMap<String, usize>,
    next_static: usize,
    heap: usize,
    pc: usize,
}

impl Machine {
    pub fn new() -> Self {
        Self {
            ram: vec![0; MEMORY_SIZE],
            next_static: STATIC,
            heap: HEAP,
            ..Default::default()
        }
    }

    /// Load the VM code of one class.
    pub fn load(&mut self, vm_code: &str) {
        let lines: Vec<Vec<&str>> = vm_code
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty())
            .collect();
        let base = self.code.len();

        // Labels are scoped to their function.
        let mut labels = HashMap::new();
        let mut function = "";
        let mut max_static = None;
        for (i, parts) in lines.iter().enumerate() {
            match parts.as_slice() {
                ["function", name, _] => {
                    function = *name;
                    self.functions.insert(name.to_string(), base + i);
                }
                ["label", label] => {
                    labels.insert((function, *label), base + i);
                }
                [_, "static", index] => {
                    let index: usize = index.parse().unwrap();
                    max_static = max_static.max(Some(index));
                }
                _ => {}
            }
        }

        let static_base = self.next_static;
        self.next_static += max_static.map_or(0, |max| max + 1);

        let mut function = "";
        for parts in &lines {
            let instr = match parts.as_slice() {
                ["push", seg, index] | ["pop", seg, index] => {
                    let mut index: usize = index.parse().unwrap();
                    let seg = match *seg {
                        "constant" => Seg::Constant,
                        "local" => Seg::Local,
                        "argument" => Seg::Argument,
                        "this" => Seg::This,
                        "that" => Seg::That,
                        "pointer" => Seg::Pointer,
                        "temp" => Seg::Temp,
                        "static" => {
                            index += static_base;
                            Seg::Static
                        }
                        other => panic!("unknown segment {other}"),
                    };
                    if parts[0] == "push" {
                        Instr::Push(seg, index)
                    } else {
                        Instr::Pop(seg, index)
                    }
                }
                ["label", _] => Instr::Nop,
                ["goto", label] => Instr::Goto(labels[&(function, *label)]),
                ["if-goto", label] => Instr::IfGoto(labels[&(function, *label)]),
                ["call", name, n_args] => Instr::Call(name.to_string(), n_args.parse().unwrap()),
                ["function", name, n_locals] => {
                    function = *name;
                    Instr::Function(n_locals.parse().unwrap())
                }
                ["return"] => Instr::Return,
                [op] => Instr::Op(match *op {
                    "add" => "add",
                    "sub" => "sub",
                    "neg" => "neg",
                    "eq" => "eq",
                    "gt" => "gt",
                    "lt" => "lt",
                    "and" => "and",
                    "or" => "or",
                    "not" => "not",
                    other => panic!("unknown command {other}"),
                }),
                other => panic!("malformed line {other:?}"),
            };
            self.code.push(instr);
        }
    }

    /// Call a function with the given arguments and run until it returns.
    pub fn call(&mut self, name: &str, args: &[i16]) -> i16 {
        self.ram[SP] = STACK as i16;
        for arg in args {
            self.push(*arg);
        }
        self.push(HALT);
        for reg in [LCL, ARG, THIS, THAT] {
            self.push(self.ram[reg]);
        }
        self.ram[ARG] = self.ram[SP] - args.len() as i16 - 5;
        self.ram[LCL] = self.ram[SP];
        self.pc = self.functions[name];

        for _ in 0..STEP_LIMIT {
            if self.step() {
                return self.ram[STACK];
            }
        }
        panic!("{name} did not return within {STEP_LIMIT} steps");
    }

    pub fn peek(&self, address: usize) -> i16 {
        self.ram[address]
    }

    /// Read a string object built by `String.new` and `String.appendChar`.
    pub fn string_at(&self, address: i16) -> String {
        let address = address as usize;
        let len = self.ram[address] as usize;
        self.ram[address + 2..address + 2 + len]
            .iter()
            .map(|c| char::from(*c as u8))
            .collect()
    }

    fn push(&mut self, value: i16) {
        let sp = self.ram[SP] as usize;
        self.ram[sp] = value;
        self.ram[SP] += 1;
    }

    fn pop(&mut self) -> i16 {
        self.ram[SP] -= 1;
        self.ram[self.ram[SP] as usize]
    }

    fn address(&self, seg: Seg, index: usize) -> usize {
        let base = |reg: usize| self.ram[reg] as u16 as usize;
        match seg {
            Seg::Local => base(LCL) + index,
            Seg::Argument => base(ARG) + index,
            Seg::This => base(THIS) + index,
            Seg::That => base(THAT) + index,
            Seg::Pointer => THIS + index,
            Seg::Temp => TEMP + index,
            Seg::Static => index,
            Seg::Constant => panic!("constant segment has no address"),
        }
    }

    fn alloc(&mut self, size: i16) -> i16 {
        let address = self.heap;
        self.heap += size as usize;
        assert!(self.heap <= MEMORY_SIZE, "out of heap memory");
        address as i16
    }

    /// Execute one instruction. Returns true when the entry function returned.
    fn step(&mut self) -> bool {
        let instr = self.code[self.pc].clone();
        self.pc += 1;

        match instr {
            Instr::Push(Seg::Constant, value) => self.push(value as i16),
            Instr::Push(seg, index) => {
                let value = self.ram[self.address(seg, index)];
                self.push(value);
            }
            Instr::Pop(seg, index) => {
                let address = self.address(seg, index);
                self.ram[address] = self.pop();
            }
            Instr::Op(op) => {
                let value = match op {
                    "neg" => self.pop().wrapping_neg(),
                    "not" => !self.pop(),
                    _ => {
                        let y = self.pop();
                        let x = self.pop();
                        match op {
                            "add" => x.wrapping_add(y),
                            "sub" => x.wrapping_sub(y),
                            "and" => x & y,
                            "or" => x | y,
                            "eq" => -((x == y) as i16),
                            "gt" => -((x > y) as i16),
                            "lt" => -((x < y) as i16),
                            _ => unreachable!(),
                        }
                    }
                };
                self.push(value);
            }
            Instr::Goto(target) => self.pc = target,
            Instr::IfGoto(target) => {
                if self.pop() != 0 {
                    self.pc = target;
                }
            }
            Instr::Call(name, n_args) => self.call_function(&name, n_args),
            Instr::Function(n_locals) => {
                for _ in 0..n_locals {
                    self.push(0);
                }
            }
            Instr::Return => {
                let frame = self.ram[LCL] as usize;
                let ret = self.ram[frame - 5];
                let result = self.pop();
                let arg = self.ram[ARG] as usize;
                self.ram[arg] = result;
                self.ram[SP] = arg as i16 + 1;
                self.ram[THAT] = self.ram[frame - 1];
                self.ram[THIS] = self.ram[frame - 2];
                self.ram[ARG] = self.ram[frame - 3];
                self.ram[LCL] = self.ram[frame - 4];

                if ret == HALT {
                    return true;
                }
                self.pc = ret as usize;
            }
            Instr::Nop => {}
        }

        false
    }

    fn call_function(&mut self, name: &str, n_args: usize) {
        if let Some(result) = self.call_native(name) {
            self.push(result);
            return;
        }

        let target = *self
            .functions
            .get(name)
            .unwrap_or_else(|| panic!("call to unknown function {name}"));
        self.push(self.pc as i16);
        for reg in [LCL, ARG, THIS, THAT] {
            self.push(self.ram[reg]);
        }
        self.ram[ARG] = self.ram[SP] - n_args as i16 - 5;
        self.ram[LCL] = self.ram[SP];
        self.pc = target;
    }

    fn call_native(&mut self, name: &str) -> Option<i16> {
        let result = match name {
            "Math.multiply" => {
                let y = self.pop();
                self.pop().wrapping_mul(y)
            }
            "Math.divide" => {
                let y = self.pop();
                self.pop().wrapping_div(y)
            }
            "Memory.alloc" | "Array.new" => {
                let size = self.pop();
                self.alloc(size)
            }
            "String.new" => {
                let capacity = self.pop();
                let address = self.alloc(capacity + 2);
                self.ram[address as usize + 1] = capacity;
                address
            }
            "String.appendChar" => {
                let c = self.pop();
                let address = self.pop();
                let len = self.ram[address as usize];
                assert!(len < self.ram[address as usize + 1], "string capacity exceeded");
                self.ram[address as usize + 2 + len as usize] = c;
                self.ram[address as usize] = len + 1;
                address
            }
            _ => return None,
        };
        Some(result)
    }
}
