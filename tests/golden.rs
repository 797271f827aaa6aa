//! Runs methods before and after optimization and compares what they do.
//!
//! The executor records every call to a static sink as an effect, so two runs behave
//! the same when they return the same value and produce the same effects in order.
//! The heap tells whether any element was boxed along the way.

mod common;

use common::{method_with_loops, single_loop, LoopShape, SINK};
use rangeopt::{
    assembly::MethodBody,
    emulation::{EmValue, ExecutionResult, Executor},
    optimize, Result,
};

struct Comparison {
    before: ExecutionResult,
    after: ExecutionResult,
}

fn run_both(original: MethodBody, args: &[EmValue]) -> Result<Comparison> {
    let mut optimized = original.clone();
    optimize("demo/Golden", &mut optimized);
    assert_ne!(optimized, original, "nothing was rewritten");

    let executor = Executor::new();
    Ok(Comparison {
        before: executor.execute(&original, args)?,
        after: executor.execute(&optimized, args)?,
    })
}

fn sunk(result: &ExecutionResult) -> Vec<EmValue> {
    result
        .effects
        .iter()
        .filter(|effect| effect.owner == SINK)
        .flat_map(|effect| effect.args.iter().copied())
        .collect()
}

fn ints(values: impl IntoIterator<Item = i32>) -> Vec<EmValue> {
    values.into_iter().map(EmValue::Int).collect()
}

fn longs(values: impl IntoIterator<Item = i64>) -> Vec<EmValue> {
    values.into_iter().map(EmValue::Long).collect()
}

fn assert_unboxed_equivalent(comparison: &Comparison, expected: &[EmValue]) {
    assert!(comparison.before.same_behavior(&comparison.after));
    assert_eq!(sunk(&comparison.before), expected);
    assert_eq!(sunk(&comparison.after), expected);
    assert_eq!(comparison.before.heap.boxed_count(), expected.len());
    assert_eq!(comparison.after.heap.boxed_count(), 0);
}

#[test]
fn ascending_until() -> Result<()> {
    let comparison = run_both(
        single_loop(&LoopShape::int("until"))?,
        &ints([0, 5]),
    )?;
    assert_unboxed_equivalent(&comparison, &ints(0..5));
    Ok(())
}

#[test]
fn inclusive_range_with_user_bounds() -> Result<()> {
    let comparison = run_both(
        single_loop(&LoopShape::int("rangeTo"))?,
        &ints([-3, 2]),
    )?;
    assert_unboxed_equivalent(&comparison, &ints(-3..=2));
    Ok(())
}

#[test]
fn descending_down_to() -> Result<()> {
    let comparison = run_both(
        single_loop(&LoopShape::int("downTo"))?,
        &ints([4, 1]),
    )?;
    assert_unboxed_equivalent(&comparison, &ints([4, 3, 2, 1]));
    Ok(())
}

#[test]
fn empty_range_runs_no_iterations() -> Result<()> {
    let comparison = run_both(
        single_loop(&LoopShape::int("until"))?,
        &ints([7, 7]),
    )?;
    assert_unboxed_equivalent(&comparison, &[]);

    let comparison = run_both(
        single_loop(&LoopShape::int("rangeTo"))?,
        &ints([3, 1]),
    )?;
    assert_unboxed_equivalent(&comparison, &[]);
    Ok(())
}

#[test]
fn stepped_progressions() -> Result<()> {
    let comparison = run_both(
        single_loop(&LoopShape::int("rangeTo").stepped(3))?,
        &ints([0, 10]),
    )?;
    assert_unboxed_equivalent(&comparison, &ints([0, 3, 6, 9]));

    let comparison = run_both(
        single_loop(&LoopShape::int("downTo").stepped(2))?,
        &ints([9, 4]),
    )?;
    assert_unboxed_equivalent(&comparison, &ints([9, 7, 5]));
    Ok(())
}

#[test]
fn long_ranges() -> Result<()> {
    let big = i64::from(i32::MAX);
    let comparison = run_both(
        single_loop(&LoopShape::long("rangeTo"))?,
        &longs([big, big + 3]),
    )?;
    assert_unboxed_equivalent(&comparison, &longs(big..=big + 3));

    let comparison = run_both(
        single_loop(&LoopShape::long("downTo").stepped(5))?,
        &longs([20, 0]),
    )?;
    assert_unboxed_equivalent(&comparison, &longs([20, 15, 10, 5, 0]));
    Ok(())
}

#[test]
fn char_range() -> Result<()> {
    let comparison = run_both(
        single_loop(&LoopShape::char())?,
        &ints([i32::from(b'a'), i32::from(b'd')]),
    )?;
    assert_unboxed_equivalent(&comparison, &ints([97, 98, 99, 100]));
    Ok(())
}

#[test]
fn two_loops_in_one_method() -> Result<()> {
    let comparison = run_both(
        method_with_loops(&[LoopShape::int("until"), LoopShape::int("downTo")])?,
        &ints([1, 3]),
    )?;
    // 1 until 3, then 1 downTo 3 is empty
    assert_unboxed_equivalent(&comparison, &ints([1, 2]));

    let comparison = run_both(
        method_with_loops(&[LoopShape::int("rangeTo"), LoopShape::int("rangeTo").stepped(2)])?,
        &ints([0, 4]),
    )?;
    assert_unboxed_equivalent(&comparison, &ints([0, 1, 2, 3, 4, 0, 2, 4]));
    Ok(())
}

#[test]
fn optimized_body_executes_fewer_instructions() -> Result<()> {
    let comparison = run_both(
        single_loop(&LoopShape::int("until"))?,
        &ints([0, 10]),
    )?;
    assert!(comparison.after.instructions < comparison.before.instructions);
    Ok(())
}
