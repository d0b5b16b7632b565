//! Parser for scripted frame inputs.
//!
//! A script is a comma-separated list of steps. Each step names one or more
//! actions joined by `+` and an optional `*count` repeat, for example
//! `forward*30, forward+dash*5, jump, idle*10, turn-left*8`.

use anyhow::{bail, Context, Result};
use prompt_world_session::FrameInput;

/// Camera rotation applied per frame by the turn and look actions, in radians.
const TURN_RATE: f32 = 0.05;

/// Expands a script into one input per frame.
pub(crate) fn parse(script: &str) -> Result<Vec<FrameInput>> {
    let mut frames = Vec::new();
    for step in script.split(',').map(str::trim).filter(|step| !step.is_empty()) {
        let (actions, count) = match step.split_once('*') {
            Some((actions, count)) => {
                let count: usize = count
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid repeat count in step `{step}`"))?;
                (actions, count)
            }
            None => (step, 1),
        };

        let mut input = FrameInput::default();
        for action in actions.split('+').map(str::trim) {
            apply_action(&mut input, action)
                .with_context(|| format!("invalid step `{step}`"))?;
        }
        frames.extend(std::iter::repeat(input).take(count));
    }
    Ok(frames)
}

fn apply_action(input: &mut FrameInput, action: &str) -> Result<()> {
    let controls = &mut input.controls;
    match action {
        "idle" => {}
        "forward" => controls.forward = true,
        "back" | "backward" => controls.backward = true,
        "left" => controls.left = true,
        "right" => controls.right = true,
        "jump" => controls.jump = true,
        "dash" => controls.dash = true,
        "turn-left" => input.yaw_delta += TURN_RATE,
        "turn-right" => input.yaw_delta -= TURN_RATE,
        "look-up" => input.pitch_delta -= TURN_RATE,
        "look-down" => input.pitch_delta += TURN_RATE,
        other => bail!("unknown action `{other}`"),
    }
    Ok(())
}
