// Tempo program - tempo ramps across repeated playthroughs
//
// Every loop step carries one BPM per section. All sections move together:
// the ramp is tracked on the first section's BPM and the same offset is
// added to every baseline value.

use serde::{Deserialize, Serialize};

/// Upper bound on generated loop steps
pub const MAX_LOOP_STEPS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TempoProgramError {
    #[error("the tempo program needs at least one section")]
    EmptyBaseline,

    #[error("tempo step must be at least 1 BPM")]
    ZeroStep,

    #[error("loop change count must be at least 1")]
    ZeroChangeCount,

    #[error("minimum tempo {min} is above maximum tempo {max}")]
    InvertedRange { min: u32, max: u32 },

    #[error("the tempo ramp reaches {0} BPM")]
    NonPositiveTempo(i64),

    #[error("the tempo program would exceed {0} loop steps")]
    TooManySteps(usize),
}

/// How the tempo evolves between loop steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopMode {
    #[default]
    Endless,
    Accelerate,
    Decelerate,
    RepeatAccelDecel,
    RepeatDecelAccel,
}

impl LoopMode {
    pub fn label(self) -> &'static str {
        match self {
            LoopMode::Endless => "endless",
            LoopMode::Accelerate => "accelerate",
            LoopMode::Decelerate => "decelerate",
            LoopMode::RepeatAccelDecel => "repeat-accel-decel",
            LoopMode::RepeatDecelAccel => "repeat-decel-accel",
        }
    }
}

impl std::fmt::Display for LoopMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tempo change settings of a training configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempoChangeProgram {
    pub mode: LoopMode,
    pub tempo_step: u32,
    pub min_tempo: u32,
    pub max_tempo: u32,
    /// Repeats of each tempo plateau
    pub loop_change_count: u32,
    /// Full cycles (repeat modes) or plateaus (endless)
    pub loop_repeat_limit: u32,
    #[serde(default, alias = "includeCountIn")]
    pub count_in: bool,
}

impl Default for TempoChangeProgram {
    fn default() -> Self {
        Self {
            mode: LoopMode::Endless,
            tempo_step: 5,
            min_tempo: 60,
            max_tempo: 180,
            loop_change_count: 4,
            loop_repeat_limit: 1,
            count_in: false,
        }
    }
}

/// One playthrough of all sections at a fixed tempo per section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopStep {
    pub bpms: Vec<u32>,
}

impl LoopStep {
    /// Tempo of the first section, the ramp reference
    pub fn reference_bpm(&self) -> u32 {
        self.bpms.first().copied().unwrap_or_default()
    }
}

/// Builds loop steps as offsets from the baseline
struct Ramp<'a> {
    baseline: &'a [u32],
    count: usize,
    steps: Vec<LoopStep>,
}

impl Ramp<'_> {
    /// Push `count` copies of the baseline shifted by `offset`
    fn push(&mut self, offset: i64) -> Result<(), TempoProgramError> {
        if self.count == 0 {
            return Ok(());
        }
        if self.steps.len() + self.count > MAX_LOOP_STEPS {
            return Err(TempoProgramError::TooManySteps(MAX_LOOP_STEPS));
        }
        let mut bpms = Vec::with_capacity(self.baseline.len());
        for &base in self.baseline {
            let bpm = base as i64 + offset;
            if bpm <= 0 {
                return Err(TempoProgramError::NonPositiveTempo(bpm));
            }
            bpms.push(bpm as u32);
        }
        let step = LoopStep { bpms };
        for _ in 1..self.count {
            self.steps.push(step.clone());
        }
        self.steps.push(step);
        Ok(())
    }
}

/// Expand a tempo program over the per-section baseline BPMs.
///
/// Ramps stop on the first plateau at or beyond the bound, so a step that
/// does not divide the range overshoots it.
pub fn generate(
    baseline: &[u32],
    program: &TempoChangeProgram,
) -> Result<Vec<LoopStep>, TempoProgramError> {
    if baseline.is_empty() {
        return Err(TempoProgramError::EmptyBaseline);
    }

    if program.mode == LoopMode::Endless {
        let mut ramp = Ramp {
            baseline,
            count: program.loop_repeat_limit as usize,
            steps: Vec::new(),
        };
        ramp.push(0)?;
        return Ok(ramp.steps);
    }

    if program.tempo_step == 0 {
        return Err(TempoProgramError::ZeroStep);
    }
    if program.loop_change_count == 0 {
        return Err(TempoProgramError::ZeroChangeCount);
    }
    if program.min_tempo > program.max_tempo {
        return Err(TempoProgramError::InvertedRange {
            min: program.min_tempo,
            max: program.max_tempo,
        });
    }

    let base = baseline[0] as i64;
    let step = program.tempo_step as i64;
    let max = program.max_tempo as i64 - base;
    let min = program.min_tempo as i64 - base;

    let mut ramp = Ramp {
        baseline,
        count: program.loop_change_count as usize,
        steps: Vec::new(),
    };

    match program.mode {
        LoopMode::Endless => {}
        LoopMode::Accelerate => {
            climb(&mut ramp, 0, step, max)?;
        }
        LoopMode::Decelerate => {
            climb(&mut ramp, 0, -step, min)?;
        }
        LoopMode::RepeatAccelDecel => {
            for _ in 0..program.loop_repeat_limit {
                let top = climb(&mut ramp, 0, step, max)?;
                let bottom = descend_from(&mut ramp, top, -step, min)?;
                return_to_baseline(&mut ramp, bottom, step)?;
            }
        }
        LoopMode::RepeatDecelAccel => {
            for _ in 0..program.loop_repeat_limit {
                let bottom = climb(&mut ramp, 0, -step, min)?;
                let top = descend_from(&mut ramp, bottom, step, max)?;
                return_to_baseline(&mut ramp, top, -step)?;
            }
        }
    }

    log::debug!(
        "tempo program {}: {} loop steps",
        program.mode,
        ramp.steps.len()
    );
    Ok(ramp.steps)
}

fn reached(offset: i64, delta: i64, bound: i64) -> bool {
    if delta > 0 { offset >= bound } else { offset <= bound }
}

/// Push the plateau at `offset`, then keep moving by `delta` until the bound
/// plateau has been pushed. Returns the final offset.
fn climb(ramp: &mut Ramp<'_>, mut offset: i64, delta: i64, bound: i64) -> Result<i64, TempoProgramError> {
    loop {
        ramp.push(offset)?;
        if reached(offset, delta, bound) {
            return Ok(offset);
        }
        offset += delta;
    }
}

/// Move by `delta` and push after every move, up to and including the bound
fn descend_from(
    ramp: &mut Ramp<'_>,
    mut offset: i64,
    delta: i64,
    bound: i64,
) -> Result<i64, TempoProgramError> {
    loop {
        offset += delta;
        ramp.push(offset)?;
        if reached(offset, delta, bound) {
            return Ok(offset);
        }
    }
}

/// Move back toward the baseline, pushing every plateau short of it
fn return_to_baseline(ramp: &mut Ramp<'_>, mut offset: i64, delta: i64) -> Result<(), TempoProgramError> {
    loop {
        offset += delta;
        if reached(offset, delta, 0) {
            return Ok(());
        }
        ramp.push(offset)?;
    }
}
