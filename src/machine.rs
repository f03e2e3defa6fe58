//! A small Hack machine: assembles the translator's output and steps it, so
//! tests can observe stack effects instead of matching on raw text.

use std::collections::HashMap;

#[derive(Clone)]
enum Instr {
    At(i16),
    Compute {
        dest_a: bool,
        dest_d: bool,
        dest_m: bool,
        comp: String,
        jump: Option<String>,
    },
}

pub struct Machine {
    rom: Vec<Instr>,
    symbols: HashMap<String, usize>,
    pub ram: Vec<i16>,
    pub pc: usize,
    a: i16,
    d: i16,
}

fn predefined_symbols() -> HashMap<String, usize> {
    let mut symbols = HashMap::new();
    for (name, addr) in [("SP", 0), ("LCL", 1), ("ARG", 2), ("THIS", 3), ("THAT", 4)] {
        symbols.insert(name.to_string(), addr);
    }
    for r in 0..16 {
        symbols.insert(format!("R{}", r), r);
    }
    symbols.insert("SCREEN".to_string(), 16384);
    symbols.insert("KBD".to_string(), 24576);
    symbols
}

fn clean(line: &str) -> Option<&str> {
    let line = line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

impl Machine {
    pub fn load(lines: &[String]) -> Machine {
        let mut symbols = predefined_symbols();

        // First pass: label definitions bind to the next instruction address.
        let mut address = 0;
        for line in lines.iter().filter_map(|l| clean(l)) {
            if let Some(label) = line.strip_prefix('(') {
                let label = label.strip_suffix(')').expect("unterminated label");
                symbols.insert(label.to_string(), address);
            } else {
                address += 1;
            }
        }

        // Second pass: resolve symbols, allocating variables from 16 up.
        let mut next_var = 16;
        let mut rom = vec![];
        for line in lines.iter().filter_map(|l| clean(l)) {
            if line.starts_with('(') {
                continue;
            }
            if let Some(token) = line.strip_prefix('@') {
                let value = if token.bytes().all(|b| b.is_ascii_digit()) {
                    token.parse::<i16>().expect("address out of range")
                } else {
                    let addr = *symbols.entry(token.to_string()).or_insert_with(|| {
                        let addr = next_var;
                        next_var += 1;
                        addr
                    });
                    addr as i16
                };
                rom.push(Instr::At(value));
            } else {
                rom.push(parse_compute(line));
            }
        }

        Machine {
            rom,
            symbols,
            ram: vec![0; 32768],
            pc: 0,
            a: 0,
            d: 0,
        }
    }

    /// Instruction address a label resolves to, if the program defines it.
    pub fn symbol(&self, name: &str) -> Option<usize> {
        self.symbols.get(name).copied()
    }

    fn step(&mut self) {
        let instr = self.rom[self.pc].clone();
        self.pc += 1;
        match instr {
            Instr::At(value) => self.a = value,
            Instr::Compute {
                dest_a,
                dest_d,
                dest_m,
                comp,
                jump,
            } => {
                let value = self.comp(&comp);
                if dest_m {
                    self.ram[self.a as u16 as usize] = value;
                }
                if dest_a {
                    self.a = value;
                }
                if dest_d {
                    self.d = value;
                }
                if let Some(jump) = jump {
                    if jump_taken(&jump, value) {
                        self.pc = self.a as u16 as usize;
                    }
                }
            }
        }
    }

    fn comp(&self, comp: &str) -> i16 {
        let a = self.a;
        let d = self.d;
        let m = self.ram[a as u16 as usize];
        match comp {
            "0" => 0,
            "1" => 1,
            "-1" => -1,
            "D" => d,
            "A" => a,
            "M" => m,
            "!D" => !d,
            "!A" => !a,
            "!M" => !m,
            "-D" => d.wrapping_neg(),
            "-A" => a.wrapping_neg(),
            "-M" => m.wrapping_neg(),
            "D+1" => d.wrapping_add(1),
            "A+1" => a.wrapping_add(1),
            "M+1" => m.wrapping_add(1),
            "D-1" => d.wrapping_sub(1),
            "A-1" => a.wrapping_sub(1),
            "M-1" => m.wrapping_sub(1),
            "D+A" => d.wrapping_add(a),
            "D+M" => d.wrapping_add(m),
            "D-A" => d.wrapping_sub(a),
            "D-M" => d.wrapping_sub(m),
            "A-D" => a.wrapping_sub(d),
            "M-D" => m.wrapping_sub(d),
            "D&A" => d & a,
            "D&M" => d & m,
            "D|A" => d | a,
            "D|M" => d | m,
            _ => panic!("unknown comp `{}`", comp),
        }
    }

    /// Step until the program counter falls off the end of the ROM.
    pub fn run_to_end(&mut self, max_steps: usize) -> bool {
        for _ in 0..max_steps {
            if self.pc >= self.rom.len() {
                return true;
            }
            self.step();
        }
        false
    }

    /// Step until the program counter reaches `target`.
    pub fn run_until(&mut self, target: usize, max_steps: usize) -> bool {
        for _ in 0..max_steps {
            if self.pc == target {
                return true;
            }
            if self.pc >= self.rom.len() {
                return false;
            }
            self.step();
        }
        false
    }
}

fn parse_compute(line: &str) -> Instr {
    let (rest, jump) = match line.split_once(';') {
        Some((rest, jump)) => (rest, Some(jump.trim().to_string())),
        None => (line, None),
    };
    let (dest, comp) = match rest.split_once('=') {
        Some((dest, comp)) => (dest, comp),
        None => ("", rest),
    };
    Instr::Compute {
        dest_a: dest.contains('A'),
        dest_d: dest.contains('D'),
        dest_m: dest.contains('M'),
        comp: comp.trim().to_string(),
        jump,
    }
}

fn jump_taken(jump: &str, value: i16) -> bool {
    match jump {
        "JGT" => value > 0,
        "JEQ" => value == 0,
        "JGE" => value >= 0,
        "JLT" => value < 0,
        "JNE" => value != 0,
        "JLE" => value <= 0,
        "JMP" => true,
        _ => panic!("unknown jump `{}`", jump),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn computes_and_stores() {
        let mut machine = Machine::load(&program(&["@2", "D=A", "@3", "D=D+A", "@0", "M=D"]));
        assert!(machine.run_to_end(100));
        assert_eq!(machine.ram[0], 5);
    }

    #[test]
    fn labels_and_jumps_resolve() {
        let mut machine = Machine::load(&program(&[
            "@counter", "M=0", "(LOOP)", "@counter", "MD=M+1", "@10", "D=D-A", "@LOOP", "D;JLT",
        ]));
        assert!(machine.run_to_end(1000));
        assert_eq!(machine.ram[16], 10);
    }
}
