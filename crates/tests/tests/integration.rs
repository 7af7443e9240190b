//! Integration tests for end-to-end Netbyte execution.
//!
//! These tests verify the full pipeline:
//! Build tree → Encode → Decode → Execute → Verify output and state.

use netbyte_bytecode::{ExpCode, OpCode, Program, Value};
use netbyte_runtime::ErrorKind;
use netbyte_tests::{block, expr, getarg, getvar, label, lit, op, var, TestHarness};

/// Straight-line program: two prints and a nested-arithmetic return.
#[test]
fn test_prints_then_returns_nested_sum() {
    let program = Program::new(vec![
        op(OpCode::SetVar, vec![var("X"), lit(0)]),
        op(OpCode::PrintV, vec![lit("Hello!")]),
        op(OpCode::PrintV, vec![lit("1234")]),
        op(
            OpCode::Return,
            vec![expr(
                ExpCode::AddNum,
                vec![expr(ExpCode::AddNum, vec![lit(10), lit(10)]), lit(10)],
            )],
        ),
    ]);

    let mut harness = TestHarness::new();
    let result = harness.run(&program).unwrap();

    assert_eq!(result, Value::Int(30));
    assert_eq!(harness.lines(), vec!["Hello!", "1234"]);
    assert_eq!(harness.var("X"), Value::Int(0));
}

/// Builds the accumulator scenario: `ABCD(y)` adds its argument to global
/// `X` and prints the running total.
fn accumulator_program() -> Program {
    let body = vec![
        op(
            OpCode::SetVar,
            vec![
                var("X"),
                expr(ExpCode::AddNum, vec![getvar("X"), getarg(0)]),
            ],
        ),
        op(OpCode::PrintV, vec![getvar("X")]),
    ];
    Program::new(vec![
        op(OpCode::SetVar, vec![var("X"), lit(0)]),
        op(
            OpCode::MkFunc,
            vec![lit("ABCD"), lit(1), block(body), block(vec![])],
        ),
        op(
            OpCode::NullEv,
            vec![expr(
                ExpCode::Repeat,
                vec![
                    lit(50),
                    expr(ExpCode::FnCall, vec![lit("ABCD"), lit(20)]),
                ],
            )],
        ),
        op(
            OpCode::NullEv,
            vec![expr(
                ExpCode::Repeat,
                vec![
                    lit(8),
                    expr(ExpCode::FnCall, vec![lit("ABCD"), lit(100)]),
                ],
            )],
        ),
    ])
}

/// Repeated function calls mutate a shared global and print in call order.
#[test]
fn test_repeated_calls_accumulate_global() {
    let mut harness = TestHarness::new();
    harness.run(&accumulator_program()).unwrap();

    assert_eq!(harness.var("X"), Value::Int(1800));

    let lines = harness.lines();
    assert_eq!(lines.len(), 58);
    assert_eq!(lines[0], "20");
    assert_eq!(lines[49], "1000");
    assert_eq!(lines[50], "1100");
    assert_eq!(lines[57], "1800");
}

/// A counting loop driven by `JUMPIF` terminates, and the post-loop
/// `IFELSE` picks the branch matching the final counter.
#[test]
fn test_jumpif_loop_and_ifelse_branch() {
    let program = Program::new(vec![
        op(OpCode::SetVar, vec![var("C"), lit(0)]),
        op(OpCode::MLabel, vec![label("loop")]),
        op(
            OpCode::SetVar,
            vec![
                var("C"),
                expr(ExpCode::AddNum, vec![getvar("C"), lit(3)]),
            ],
        ),
        op(
            OpCode::JumpIf,
            vec![
                expr(ExpCode::LsrEql, vec![getvar("C"), lit(10)]),
                label("loop"),
            ],
        ),
        op(
            OpCode::Return,
            vec![expr(
                ExpCode::IfElse,
                vec![
                    expr(ExpCode::GrtThn, vec![getvar("C"), lit(11)]),
                    block(vec![op(OpCode::Return, vec![lit("high")])]),
                    block(vec![op(OpCode::Return, vec![lit("low")])]),
                ],
            )],
        ),
    ]);

    let mut harness = TestHarness::new();
    let result = harness.run(&program).unwrap();

    // Counter steps 3, 6, 9, 12; first value above 10 ends the loop.
    assert_eq!(harness.var("C"), Value::Int(12));
    assert_eq!(result, Value::Str("high".into()));
}

/// Encoding and decoding a program with every operand kind must not
/// change its behavior.
#[test]
fn test_roundtrip_preserves_behavior() {
    let program = accumulator_program();

    let mut direct = TestHarness::new();
    let direct_result = direct.run(&program).unwrap();

    let mut roundtrip = TestHarness::new();
    let roundtrip_result = roundtrip.run_roundtrip(&program).unwrap();

    assert_eq!(direct_result, roundtrip_result);
    assert_eq!(direct.lines(), roundtrip.lines());
    assert_eq!(direct.var("X"), roundtrip.var("X"));
}

/// Two fresh runs of the same program produce identical results, output,
/// and final state.
#[test]
fn test_execution_is_deterministic() {
    let program = accumulator_program();

    let mut first = TestHarness::new();
    let mut second = TestHarness::new();
    let a = first.run(&program).unwrap();
    let b = second.run(&program).unwrap();

    assert_eq!(a, b);
    assert_eq!(first.lines(), second.lines());
    assert_eq!(first.var("X"), second.var("X"));
}

/// An out-of-range argument read faults the run, leaving earlier state
/// observable.
#[test]
fn test_argument_fault_preserves_state() {
    let program = Program::new(vec![
        op(OpCode::SetVar, vec![var("BEFORE"), lit(7)]),
        op(
            OpCode::MkFunc,
            vec![
                lit("ONE"),
                lit(1),
                block(vec![op(OpCode::NullEv, vec![getarg(3)])]),
                block(vec![]),
            ],
        ),
        op(
            OpCode::NullEv,
            vec![expr(ExpCode::FnCall, vec![lit("ONE"), lit(0)])],
        ),
        op(OpCode::SetVar, vec![var("AFTER"), lit(1)]),
    ]);

    let mut harness = TestHarness::new();
    let err = harness.run(&program).unwrap_err();

    assert_eq!(err.kind, ErrorKind::ArgumentIndex { index: 3, len: 1 });
    assert_eq!(err.at, 2);
    assert_eq!(harness.var("BEFORE"), Value::Int(7));
    assert!(!harness.env().has_var("AFTER"));
}

/// Calling a never-registered function faults without disturbing prior
/// bindings.
#[test]
fn test_undefined_function_fault() {
    let program = Program::new(vec![
        op(OpCode::SetVar, vec![var("X"), lit(1)]),
        op(
            OpCode::NullEv,
            vec![expr(ExpCode::FnCall, vec![lit("MISSING")])],
        ),
    ]);

    let mut harness = TestHarness::new();
    let err = harness.run(&program).unwrap_err();

    assert_eq!(err.kind, ErrorKind::UndefinedFunction("MISSING".into()));
    assert_eq!(err.at, 1);
    assert_eq!(harness.var("X"), Value::Int(1));
}

/// Registering the same function name twice faults at the second
/// definition; operations before it have run, operations after have not.
#[test]
fn test_duplicate_function_fault() {
    let define = op(
        OpCode::MkFunc,
        vec![lit("F"), lit(0), block(vec![]), block(vec![])],
    );
    let program = Program::new(vec![
        op(OpCode::PrintV, vec![lit("first")]),
        define.clone(),
        define,
        op(OpCode::PrintV, vec![lit("unreached")]),
    ]);

    let mut harness = TestHarness::new();
    let err = harness.run(&program).unwrap_err();

    assert_eq!(err.kind, ErrorKind::DuplicateFunction("F".into()));
    assert_eq!(err.at, 2);
    assert_eq!(harness.lines(), vec!["first"]);
}

/// Re-running an unchanged faulting program fails identically.
#[test]
fn test_faults_are_deterministic() {
    let program = Program::new(vec![op(
        OpCode::NullEv,
        vec![getvar("NEVER_SET")],
    )]);

    let first = TestHarness::new().run(&program).unwrap_err();
    let second = TestHarness::new().run(&program).unwrap_err();
    assert_eq!(first, second);
}

/// String manipulation chains survive the codec and evaluate in order.
#[test]
fn test_string_pipeline_roundtrip() {
    let program = Program::new(vec![
        op(
            OpCode::SetVar,
            vec![
                var("GREETING"),
                expr(
                    ExpCode::Concat,
                    vec![
                        expr(ExpCode::SSlice, vec![lit("Hello, world"), lit(0), lit(5)]),
                        lit(" "),
                        expr(ExpCode::SpsChr, vec![lit("netbyte"), lit(0)]),
                        expr(ExpCode::VToStr, vec![lit(42)]),
                    ],
                ),
            ],
        ),
        op(OpCode::Return, vec![getvar("GREETING")]),
    ]);

    let mut harness = TestHarness::new();
    let result = harness.run_roundtrip(&program).unwrap();
    assert_eq!(result, Value::Str("Hello n42".into()));
}
