use nom::{
    branch::alt,
    bytes::complete::{is_a, tag},
    character::{
        complete::{digit1, space1},
        is_digit,
    },
    combinator::{map, map_res, verify},
    sequence::tuple,
    IResult,
};

use crate::ast::{Command::*, Segment::*, *};
use crate::error::TranslateError;

const SEGMENTS: &[&str] = &[
    "constant", "local", "static", "argument", "this", "that", "pointer", "temp",
];

fn integer(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |c: &str| c.parse())(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
    map(
        alt((
            tag("constant"),
            tag("local"),
            tag("static"),
            tag("argument"),
            tag("this"),
            tag("that"),
            tag("pointer"),
            tag("temp"),
        )),
        |seg| match seg {
            "constant" => Constant,
            "local" => Local,
            "static" => Static,
            "argument" => Argument,
            "this" => This,
            "that" => That,
            "pointer" => Pointer,
            "temp" => Temp,
            _ => unreachable!("segment tag {}", seg),
        },
    )(input)
}

fn push(input: &str) -> IResult<&str, Command> {
    map(
        tuple((tag("push"), space1, segment, space1, integer)),
        |(_, _, segment, _, arg)| Push(segment, arg),
    )(input)
}

#[test]
fn test_push() {
    assert_eq!(push("push  pointer  1"), Ok(("", Push(Pointer, 1))));
}

fn pop(input: &str) -> IResult<&str, Command> {
    verify(
        map(
            tuple((tag("pop"), space1, segment, space1, integer)),
            |(_, _, segment, _, arg)| Pop(segment, arg),
        ),
        |p| !matches!(p, Pop(Constant, _)),
    )(input)
}

fn prim(input: &str) -> IResult<&str, Command> {
    map(
        alt((
            tag("add"),
            tag("sub"),
            tag("neg"),
            tag("eq"),
            tag("gt"),
            tag("lt"),
            tag("and"),
            tag("or"),
            tag("not"),
        )),
        |prim| match prim {
            "add" => Add,
            "sub" => Sub,
            "neg" => Neg,
            "eq" => Eq,
            "gt" => Gt,
            "lt" => Lt,
            "and" => And,
            "or" => Or,
            "not" => Not,
            _ => unreachable!("operator tag {}", prim),
        },
    )(input)
}

#[test]
fn test_prim() {
    assert_eq!(prim("neg"), Ok(("", Neg)));
}

fn symbol(input: &str) -> IResult<&str, String> {
    map(
        verify(
            is_a("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.$:0123456789"),
            |c: &str| !is_digit(c.as_bytes()[0]),
        ),
        |sym: &str| sym.to_string(),
    )(input)
}

fn branching(input: &str) -> IResult<&str, Command> {
    map(
        tuple((
            alt((tag("label"), tag("goto"), tag("if-goto"))),
            space1,
            symbol,
        )),
        |(op, _, sym)| match op {
            "label" => Label(sym),
            "goto" => Goto(sym),
            "if-goto" => IfGoto(sym),
            _ => unreachable!("branch tag {}", op),
        },
    )(input)
}

#[test]
fn test_branching() {
    assert_eq!(
        branching("if-goto Main.loop$END"),
        Ok(("", IfGoto("Main.loop$END".to_string())))
    );
}

fn function(input: &str) -> IResult<&str, Command> {
    map(
        tuple((tag("function"), space1, symbol, space1, integer)),
        |(_, _, name, _, n_vars)| Function(name, n_vars),
    )(input)
}

#[test]
fn test_function() {
    assert_eq!(
        function("function Main.fib 2"),
        Ok(("", Function("Main.fib".to_string(), 2)))
    );
}

fn call(input: &str) -> IResult<&str, Command> {
    map(
        tuple((tag("call"), space1, symbol, space1, integer)),
        |(_, _, name, _, n_args)| Call(name, n_args),
    )(input)
}

#[test]
fn test_call() {
    assert_eq!(
        call("call Sys.init 0"),
        Ok(("", Call("Sys.init".to_string(), 0)))
    );
}

fn ret(input: &str) -> IResult<&str, Command> {
    map(tag("return"), |_| Return)(input)
}

fn command(line: &str) -> Result<Command, TranslateError> {
    match alt((push, pop, prim, branching, function, call, ret))(line) {
        Ok(("", command)) => Ok(command),
        // A keyword prefix followed by more of the same token ("addx") is not
        // a match; only whitespace separates a command from trailing garbage.
        Ok((rest, _)) if rest.starts_with(char::is_whitespace) => {
            Err(TranslateError::TrailingInput {
                line: line.to_string(),
                rest: rest.trim_start().to_string(),
            })
        }
        _ => Err(diagnose(line)),
    }
}

/// Turn a line none of the command parsers accepted into the precise error.
fn diagnose(line: &str) -> TranslateError {
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let missing = |operand| TranslateError::MissingOperand {
        line: line.to_string(),
        operand,
    };

    match head {
        "push" | "pop" => {
            let seg = match parts.next() {
                Some(seg) => seg,
                None => return missing("segment"),
            };
            if !SEGMENTS.contains(&seg) {
                return TranslateError::InvalidSegment {
                    line: line.to_string(),
                    segment: seg.to_string(),
                };
            }
            if head == "pop" && seg == "constant" {
                return TranslateError::PopConstant;
            }
            match parts.next() {
                Some(_) => TranslateError::InvalidIndex {
                    line: line.to_string(),
                },
                None => missing("index"),
            }
        }
        "label" | "goto" | "if-goto" => match parts.next() {
            Some(_) => TranslateError::InvalidName {
                line: line.to_string(),
            },
            None => missing("label name"),
        },
        "function" | "call" => {
            if parts.next().is_none() {
                return missing("function name");
            }
            match parts.next() {
                None => missing(if head == "function" {
                    "variable count"
                } else {
                    "argument count"
                }),
                // The count is fine, so the name must be what the parser choked on.
                Some(n) if n.parse::<u16>().is_ok() => TranslateError::InvalidName {
                    line: line.to_string(),
                },
                Some(_) => TranslateError::InvalidIndex {
                    line: line.to_string(),
                },
            }
        }
        _ => TranslateError::UnknownCommand(head.to_string()),
    }
}

pub fn parse(input: &str) -> Result<Vec<Command>, TranslateError> {
    let mut commands = vec![];

    for line in input.lines() {
        let line = line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim();
        if line.is_empty() {
            continue;
        }
        commands.push(command(line)?);
    }

    Ok(commands)
}

#[test]
fn test_parse_strips_comments_and_blanks() {
    let source = "\n// setup\npush constant 7 // seven\n\nreturn\n";
    assert_eq!(parse(source), Ok(vec![Push(Constant, 7), Return]));
}

#[test]
fn test_parse_rejects_unknown_command() {
    assert_eq!(
        parse("frobnicate 3"),
        Err(TranslateError::UnknownCommand("frobnicate".to_string()))
    );
    assert_eq!(
        parse("addx"),
        Err(TranslateError::UnknownCommand("addx".to_string()))
    );
}

#[test]
fn test_parse_rejects_pop_constant() {
    assert_eq!(parse("pop constant 3"), Err(TranslateError::PopConstant));
}

#[test]
fn test_parse_rejects_bad_segment() {
    assert_eq!(
        parse("push heap 0"),
        Err(TranslateError::InvalidSegment {
            line: "push heap 0".to_string(),
            segment: "heap".to_string(),
        })
    );
}

#[test]
fn test_parse_rejects_missing_operands() {
    assert_eq!(
        parse("push constant"),
        Err(TranslateError::MissingOperand {
            line: "push constant".to_string(),
            operand: "index",
        })
    );
    assert_eq!(
        parse("call Sys.init"),
        Err(TranslateError::MissingOperand {
            line: "call Sys.init".to_string(),
            operand: "argument count",
        })
    );
    assert_eq!(
        parse("goto"),
        Err(TranslateError::MissingOperand {
            line: "goto".to_string(),
            operand: "label name",
        })
    );
}

#[test]
fn test_parse_rejects_oversized_index() {
    assert_eq!(
        parse("push constant 65536"),
        Err(TranslateError::InvalidIndex {
            line: "push constant 65536".to_string(),
        })
    );
}

#[test]
fn test_parse_rejects_trailing_input() {
    assert_eq!(
        parse("return 0"),
        Err(TranslateError::TrailingInput {
            line: "return 0".to_string(),
            rest: "0".to_string(),
        })
    );
}
