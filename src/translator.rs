use std::collections::HashSet;

use crate::ast::{Command::*, Segment::*, *};
use crate::error::TranslateError;

// TODO: Consider using a static-level string interner for this module
macro_rules! svec {
    ($($x:expr),*) => (vec![$($x.to_string()),*]);
}

/// Caller state saved by `call`, in push order; `return` walks it backwards.
const SAVED_SEGMENTS: [&str; 4] = ["LCL", "ARG", "THIS", "THAT"];

/// Where the stack lives when the bootstrap hands control to `Sys.init`.
const STACK_BASE: u16 = 256;

fn at_c(arg: u16) -> String {
    format!("@{arg}", arg = arg)
}

fn at_s(arg: &str) -> String {
    format!("@{arg}", arg = arg)
}

fn pointer_arg(arg: u16) -> Result<&'static str, TranslateError> {
    match arg {
        0 => Ok("THIS"),
        1 => Ok("THAT"),
        _ => Err(TranslateError::PointerIndex(arg)),
    }
}

/// Write D to the current stack top, then advance SP.
fn push_d() -> Vec<String> {
    svec![
        "@SP",
        "M=M+1",
        "A=M-1", // Don't need to refetch SP; this is safe
        "M=D"
    ]
}

/// Push microcode for the four pointer segments
fn seg_push(seg_name: &str, seg: &str, arg: u16) -> Vec<String> {
    let mut out = svec![
        format!("// push {} {}", seg_name, arg),
        at_s(seg),
        "D=M",
        at_c(arg),
        "A=D+A", // A = base + arg
        "D=M"    // D = value to push
    ];
    out.extend(push_d());
    out
}

/// Push microcode for segments whose address is known at translation time
fn seg_push_direct(seg_name: &str, arg: u16, label: String) -> Vec<String> {
    let mut out = svec![
        format!("// push {} {}", seg_name, arg),
        format!("@{}", label),
        "D=M"
    ];
    out.extend(push_d());
    out
}

fn seg_pop(seg_name: &str, seg: &str, arg: u16) -> Vec<String> {
    svec![
        format!("// pop {} {}", seg_name, arg),
        at_s(seg),
        "D=M",
        at_c(arg),
        "D=D+A", // D = base + arg
        "@R13",
        "M=D", // Store the target address in R13
        "@SP",
        "AM=M-1", // SP--, A <- new SP (val to be popped)
        "D=M",
        "@R13",
        "A=M", // At the target address...
        "M=D"  // ... store the popped val
    ]
}

fn seg_pop_direct(seg_name: &str, arg: u16, label: String) -> Vec<String> {
    svec![
        format!("// pop {} {}", seg_name, arg),
        "@SP",
        "AM=M-1",
        "D=M",
        format!("@{}", label),
        "M=D"
    ]
}

fn simple_un_op(name: &str, comp: &str) -> Vec<String> {
    svec![format!("// {}", name), "@SP", "A=M-1", comp]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(name: &str, comp: &str) -> Vec<String> {
    svec![
        format!("// {}", name),
        "@SP",
        "AM=M-1", // SP--, looking at top of stack now
        "D=M",    // Right arg in D
        "A=A-1",  // Looking at second arg of stack, will overwrite
        comp      // Op and overwrite second element
    ]
}

fn write_return() -> Vec<String> {
    let mut out = svec![
        "// return",
        "@LCL",
        "D=M",
        "@R13",
        "M=D", // R13 = frame base
        "@5",
        "A=D-A",
        "D=M",
        "@R14",
        "M=D", // R14 = *(frame - 5), the return address
        "@SP",
        "AM=M-1",
        "D=M",
        "@ARG",
        "A=M",
        "M=D", // Result lands at ARG[0], the caller's stack top
        "@ARG",
        "D=M+1",
        "@SP",
        "M=D" // SP = ARG + 1
    ];
    // Restore in the mirror of the order `call` pushed them
    for seg in SAVED_SEGMENTS.iter().rev() {
        out.extend(svec!["@R13", "AM=M-1", "D=M", at_s(seg), "M=D"]);
    }
    out.extend(svec!["@R14", "A=M", "0;JMP"]);
    out
}

pub struct Translator {
    module: String,
    function: String,
    label_counter: usize,
    functions: HashSet<String>,
}

impl Translator {
    pub fn new() -> Self {
        Translator {
            module: String::new(),
            // Until the first `function`, labels belong to the bootstrap frame.
            function: "OS".to_string(),
            label_counter: 0,
            functions: HashSet::new(),
        }
    }

    /// Names the translation unit being processed; statics resolve against it.
    pub fn set_module(&mut self, name: &str) {
        self.module = name.to_string();
    }

    fn next_label(&mut self) -> usize {
        let tmp = self.label_counter;
        self.label_counter += 1;
        tmp
    }

    fn push(&self, segment: Segment, arg: u16) -> Result<Vec<String>, TranslateError> {
        Ok(match segment {
            Constant => {
                let mut out = svec![format!("// push constant {}", arg), at_c(arg), "D=A"];
                out.extend(push_d());
                out
            }
            Local => seg_push("local", "LCL", arg),
            Argument => seg_push("argument", "ARG", arg),
            This => seg_push("this", "THIS", arg),
            That => seg_push("that", "THAT", arg),
            Static => seg_push_direct("static", arg, format!("{}.{}", self.module, arg)),
            Temp => seg_push_direct("temp", arg, format!("R{}", u32::from(arg) + 5)),
            Pointer => seg_push_direct("pointer", arg, pointer_arg(arg)?.to_string()),
        })
    }

    fn pop(&self, segment: Segment, arg: u16) -> Result<Vec<String>, TranslateError> {
        Ok(match segment {
            Constant => return Err(TranslateError::PopConstant),
            Local => seg_pop("local", "LCL", arg),
            Argument => seg_pop("argument", "ARG", arg),
            This => seg_pop("this", "THIS", arg),
            That => seg_pop("that", "THAT", arg),
            Static => seg_pop_direct("static", arg, format!("{}.{}", self.module, arg)),
            Temp => seg_pop_direct("temp", arg, format!("R{}", u32::from(arg) + 5)),
            Pointer => seg_pop_direct("pointer", arg, pointer_arg(arg)?.to_string()),
        })
    }

    fn compare(&mut self, cmp_name: &str, jump: &str) -> Vec<String> {
        let label = format!("CompLabel{}", self.next_label());
        svec![
            format!("// {}", cmp_name),
            "@SP",
            "AM=M-1", // SP--, looking at top of stack now
            "D=M",    // Right arg in D
            "A=A-1",  // Looking at second arg of stack, will overwrite
            "D=M-D",
            "M=-1", // Assume true...
            at_s(&label),
            format!("D;{}", jump),
            "@SP",
            "A=M-1",
            "M=0", // ... overwrite with false when the jump falls through
            format!("({})", label)
        ]
    }

    /// Scope a VM label to the enclosing function so identical label text in
    /// different functions never collides.
    fn label_to_sym(&self, label: &str) -> String {
        format!("{}${}", self.function, label)
    }

    fn label(&self, label: &str) -> Vec<String> {
        svec![
            format!("// label {}", label),
            format!("({})", self.label_to_sym(label))
        ]
    }

    fn goto(&self, label: &str) -> Vec<String> {
        svec![
            format!("// goto {}", label),
            at_s(&self.label_to_sym(label)),
            "0;JMP" // Unconditional jump
        ]
    }

    fn if_goto(&self, label: &str) -> Vec<String> {
        svec![
            format!("// if-goto {}", label),
            "@SP",
            "AM=M-1",
            "D=M", // Stack popped into D
            at_s(&self.label_to_sym(label)),
            "D;JNE" // False is 0
        ]
    }

    fn write_function(&mut self, name: &str, n_vars: u16) -> Result<Vec<String>, TranslateError> {
        // One flat label namespace across all linked units; a second
        // definition would silently hijack every call to the first.
        if !self.functions.insert(name.to_string()) {
            return Err(TranslateError::DuplicateFunction(name.to_string()));
        }
        self.function = name.to_string();
        let mut out = svec![format!("// function {} {}", name, n_vars), format!("({})", name)];
        // Locals default to zero, stacked immediately above the frame
        for _ in 0..n_vars {
            out.extend(self.push(Constant, 0)?);
        }
        Ok(out)
    }

    fn write_call(&mut self, name: &str, n_args: u16) -> Vec<String> {
        let label = self.next_label();
        let ret = format!("{}$ret.{}", self.function, label);
        let mut out = svec![format!("// call {} {}", name, n_args), at_s(&ret), "D=A"];
        out.extend(push_d());
        for seg in SAVED_SEGMENTS {
            out.push(at_s(seg));
            out.push("D=M".to_string());
            out.extend(push_d());
        }
        out.extend(svec![
            // ARG = SP - 5 - nArgs: the frame header is five words, sitting
            // above the arguments already on the stack
            "@SP",
            "D=M",
            "@5",
            "D=D-A",
            at_c(n_args),
            "D=D-A",
            "@ARG",
            "M=D",
            // LCL = SP
            "@SP",
            "D=M",
            "@LCL",
            "M=D",
            at_s(name),
            "0;JMP",
            format!("({})", ret)
        ]);
        out
    }

    /// Emitted once, before any unit's code: set up the stack and enter the
    /// program through `Sys.init` from a synthetic enclosing frame.
    pub fn bootstrap(&mut self) -> Result<Vec<String>, TranslateError> {
        let mut out = svec!["// bootstrap", at_c(STACK_BASE), "D=A", "@SP", "M=D"];
        out.extend(self.write_function("OS", 0)?);
        out.extend(self.write_call("Sys.init", 0));
        Ok(out)
    }

    pub fn translate(&mut self, commands: &[Command]) -> Result<Vec<String>, TranslateError> {
        let mut instructions: Vec<String> = vec![];

        for command in commands {
            let translated = match command {
                Push(seg, arg) => self.push(*seg, *arg)?,
                Pop(seg, arg) => self.pop(*seg, *arg)?,
                Not => simple_un_op("not", "M=!M"),
                Neg => simple_un_op("neg", "M=-M"),
                Add => simple_bin_op("add", "M=D+M"),
                Sub => simple_bin_op("sub", "M=M-D"),
                And => simple_bin_op("and", "M=D&M"),
                Or => simple_bin_op("or", "M=D|M"),
                Eq => self.compare("eq", "JEQ"),
                Gt => self.compare("gt", "JGT"),
                Lt => self.compare("lt", "JLT"),
                Label(sym) => self.label(sym),
                Goto(sym) => self.goto(sym),
                IfGoto(sym) => self.if_goto(sym),
                Function(name, n_vars) => self.write_function(name, *n_vars)?,
                Call(name, n_args) => self.write_call(name, *n_args),
                Return => write_return(),
            };

            instructions.extend(translated);
        }

        Ok(instructions)
    }
}
