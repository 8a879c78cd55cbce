// Training program compiler - beat map + tempo program -> flat loop steps
//
// Each compiled step holds the click voice events and one event list per
// rhythm voice, already split into one event per subdivision. Compilation is
// eager and pure: the same inputs always give the same program.

use serde::Serialize;

use super::beat_map::BeatMap;
use super::section::Section;
use super::tempo_program::{LoopMode, LoopStep, TempoChangeProgram, TempoProgramError, generate};
use crate::sequencer::instruments::DEFAULT_SOUND;
use crate::sequencer::accent::TrainingAccent;
use crate::sequencer::timeline::{
    Denominator, NoteValue, subdivision_seconds, training_seconds_per_beat,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("add at least one section before playing")]
    NoSections,

    #[error("add at least one part before playing")]
    NoParts,

    #[error("the tempo program produced no loop steps")]
    EmptyProgram,

    #[error(transparent)]
    TempoProgram(#[from] TempoProgramError),
}

/// One metronome pulse
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub bpm: u32,
    pub note_value: NoteValue,
    pub denominator: Denominator,
    pub accent: TrainingAccent,
}

impl ClickEvent {
    pub fn duration(&self) -> f64 {
        training_seconds_per_beat(self.bpm as f64, self.denominator, self.note_value)
    }
}

/// One sample trigger of a rhythm voice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceNoteEvent {
    pub bpm: u32,
    pub note_value: NoteValue,
    pub denominator: Denominator,
    pub n: u8,
    pub m: u8,
    pub sound: String,
    pub volume: f32,
}

impl VoiceNoteEvent {
    /// Time until the next event of the same voice
    pub fn duration(&self) -> f64 {
        subdivision_seconds(
            self.bpm as f64,
            self.denominator,
            self.note_value,
            self.n,
            self.m,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    /// Index into the generated tempo program
    Regular { loop_index: usize },
    /// Bell-accented bar announcing a tempo change
    CountIn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledStep {
    pub kind: StepKind,
    pub bpms: Vec<u32>,
    pub clicks: Vec<ClickEvent>,
    pub voices: Vec<Vec<VoiceNoteEvent>>,
}

impl CompiledStep {
    pub fn is_count_in(&self) -> bool {
        self.kind == StepKind::CountIn
    }

    /// Longest voice, clicks included
    pub fn duration(&self) -> f64 {
        let clicks: f64 = self.clicks.iter().map(ClickEvent::duration).sum();
        self.voices
            .iter()
            .map(|events| events.iter().map(VoiceNoteEvent::duration).sum::<f64>())
            .fold(clicks, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CompiledProgram {
    pub steps: Vec<CompiledStep>,
}

impl CompiledProgram {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn count_ins(&self) -> usize {
        self.steps.iter().filter(|s| s.is_count_in()).count()
    }

    pub fn total_seconds(&self) -> f64 {
        self.steps.iter().map(CompiledStep::duration).sum()
    }
}

/// Compile a beat map under a tempo program
pub fn compile(
    map: &BeatMap,
    program: &TempoChangeProgram,
) -> Result<CompiledProgram, CompileError> {
    let sections = map.sections();
    if sections.is_empty() {
        return Err(CompileError::NoSections);
    }
    if map.parts().is_empty() {
        return Err(CompileError::NoParts);
    }

    let baseline: Vec<u32> = sections.iter().map(|s| s.bpm).collect();
    let loop_steps = generate(&baseline, program)?;
    if loop_steps.is_empty() {
        return Err(CompileError::EmptyProgram);
    }

    let plan = PlayOrder::new(sections);
    let with_count_in = program.count_in && program.mode != LoopMode::Endless;
    let change_every = program.loop_change_count.max(1) as usize;

    let mut steps = Vec::with_capacity(loop_steps.len());
    for (loop_index, loop_step) in loop_steps.iter().enumerate() {
        if with_count_in && loop_index > 0 && loop_index % change_every == 0 {
            steps.push(count_in_step(map, loop_step));
        }
        steps.push(regular_step(map, &plan, loop_index, loop_step));
    }

    log::debug!(
        "compiled {} steps ({} count-ins, {:.1}s)",
        steps.len(),
        steps.iter().filter(|s| s.is_count_in()).count(),
        steps.iter().map(CompiledStep::duration).sum::<f64>()
    );
    Ok(CompiledProgram { steps })
}

/// Global slot indices in playing order, each section repeated `loop_count`
/// times, with the owning section of every slot
struct PlayOrder {
    slots: Vec<usize>,
    owner: Vec<usize>,
}

impl PlayOrder {
    fn new(sections: &[Section]) -> Self {
        let mut slots = Vec::new();
        let mut owner = Vec::new();
        let mut start = 0;
        for (index, section) in sections.iter().enumerate() {
            let range = start..start + section.numerator as usize;
            for _ in 0..section.loop_count {
                slots.extend(range.clone());
            }
            owner.extend(std::iter::repeat_n(index, range.len()));
            start = range.end;
        }
        Self { slots, owner }
    }
}

fn regular_step(
    map: &BeatMap,
    plan: &PlayOrder,
    loop_index: usize,
    loop_step: &LoopStep,
) -> CompiledStep {
    let sections = map.sections();
    let accents = map.accents();

    // accents follow a running click counter, so a repeated section moves on
    // through the accent list instead of replaying its own slots
    let clicks = plan
        .slots
        .iter()
        .enumerate()
        .map(|(counter, &slot)| {
            let section = &sections[plan.owner[slot]];
            ClickEvent {
                bpm: loop_step.bpms[plan.owner[slot]],
                note_value: section.note_value,
                denominator: section.denominator,
                accent: accent_at(accents, counter),
            }
        })
        .collect();

    let voices = map
        .parts()
        .iter()
        .map(|part| {
            let mut events = Vec::new();
            let mut cursor = 0;
            while cursor < plan.slots.len() {
                let slot = plan.slots[cursor];
                let beat = &part.beats[slot];
                if !beat.is_start {
                    // orphan continuation: nothing to play, keep walking
                    cursor += 1;
                    continue;
                }
                let owner = plan.owner[slot];
                let section = &sections[owner];
                events.extend((0..beat.m as usize).map(|sub| VoiceNoteEvent {
                    bpm: loop_step.bpms[owner],
                    note_value: section.note_value,
                    denominator: section.denominator,
                    n: beat.n,
                    m: beat.m,
                    sound: beat.sound.clone(),
                    volume: beat.volume_at(sub),
                }));
                cursor += beat.span();
            }
            events
        })
        .collect();

    CompiledStep {
        kind: StepKind::Regular { loop_index },
        bpms: loop_step.bpms.clone(),
        clicks,
        voices,
    }
}

/// One bar of the first section at the upcoming tempo: bell on the first
/// click, silent rhythm voices
fn count_in_step(map: &BeatMap, upcoming: &LoopStep) -> CompiledStep {
    let first = &map.sections()[0];
    let bpm = upcoming.reference_bpm();
    let beats = first.numerator as usize;

    let clicks = (0..beats)
        .map(|i| ClickEvent {
            bpm,
            note_value: first.note_value,
            denominator: first.denominator,
            accent: if i == 0 {
                TrainingAccent::Bell
            } else {
                accent_at(map.accents(), i)
            },
        })
        .collect();

    let silent = VoiceNoteEvent {
        bpm,
        note_value: first.note_value,
        denominator: first.denominator,
        n: 1,
        m: 1,
        sound: DEFAULT_SOUND.to_string(),
        volume: 0.0,
    };
    let voices = map
        .parts()
        .iter()
        .map(|_| vec![silent.clone(); beats])
        .collect();

    CompiledStep {
        kind: StepKind::CountIn,
        bpms: upcoming.bpms.clone(),
        clicks,
        voices,
    }
}

fn accent_at(accents: &[TrainingAccent], index: usize) -> TrainingAccent {
    if accents.is_empty() {
        TrainingAccent::Normal
    } else {
        accents[index % accents.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::section::Beat;

    fn single_bar() -> BeatMap {
        let mut map = BeatMap::with_sections(vec![Section::default()], 1).unwrap();
        map.save_beat(0, 0, 0, Beat::figure(4, 4, "kick", vec![1.0; 4]))
            .unwrap();
        map
    }

    fn endless(limit: u32) -> TempoChangeProgram {
        TempoChangeProgram {
            mode: LoopMode::Endless,
            loop_repeat_limit: limit,
            ..TempoChangeProgram::default()
        }
    }

    #[test]
    fn test_single_bar_scenario() {
        let program = compile(&single_bar(), &endless(1)).unwrap();
        assert_eq!(program.len(), 1);

        let step = &program.steps[0];
        assert_eq!(step.clicks.len(), 4);
        assert!(step.clicks.iter().all(|c| c.bpm == 120));
        assert!(step.clicks.iter().all(|c| c.accent == TrainingAccent::Normal));

        let rhythm = &step.voices[0];
        assert_eq!(rhythm.len(), 4);
        for event in rhythm {
            assert_eq!(event.sound, "kick");
            assert_eq!(event.volume, 1.0);
            assert_eq!(event.duration(), 0.5);
        }
        assert_eq!(step.duration(), 2.0);
    }

    #[test]
    fn test_eighth_reference_section_timing() {
        let mut map = BeatMap::with_sections(
            vec![Section::new(4, Denominator::QUARTER, NoteValue::Eighth, 60)],
            1,
        )
        .unwrap();
        map.save_beat(0, 0, 0, Beat::figure(1, 2, "kick", vec![]))
            .unwrap();
        let step = &compile(&map, &endless(1)).unwrap().steps[0];
        // 60 bpm eighth reference in 4/4: 2 s per beat
        assert!(step.clicks.iter().all(|c| c.duration() == 2.0));
        assert_eq!(step.voices[0][0].duration(), 1.0);
        assert_eq!(step.duration(), 8.0);
    }

    #[test]
    fn test_continuations_are_skipped() {
        let mut map = BeatMap::with_sections(vec![Section::default()], 1).unwrap();
        map.save_beat(0, 1, 0, Beat::figure(2, 3, "snare", vec![0.2, 0.4, 0.6]))
            .unwrap();
        let program = compile(&map, &endless(1)).unwrap();
        let events = &program.steps[0].voices[0];
        // placeholder, 3 subdivisions, placeholder
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].volume, 0.0);
        let volumes: Vec<f32> = events[1..4].iter().map(|e| e.volume).collect();
        assert_eq!(volumes, vec![0.2, 0.4, 0.6]);
        assert_eq!(events[4].sound, "kick");
    }

    #[test]
    fn test_loop_count_repeats_section() {
        let mut map = BeatMap::with_sections(
            vec![
                Section::new(3, Denominator::QUARTER, NoteValue::Quarter, 120),
                Section::new(2, Denominator::EIGHTH, NoteValue::Quarter, 90),
            ],
            1,
        )
        .unwrap();
        map.set_section_loop_count(0, 2).unwrap();
        map.set_accent(0, TrainingAccent::Strong).unwrap();
        map.set_accent(2, TrainingAccent::Weak).unwrap();
        map.set_accent(3, TrainingAccent::None).unwrap();

        let program = compile(&map, &endless(1)).unwrap();
        let step = &program.steps[0];
        assert_eq!(step.clicks.len(), 8);
        // one running accent index over the 8 clicks, wrapping the 5 accents
        let accents: Vec<TrainingAccent> = step.clicks.iter().map(|c| c.accent).collect();
        assert_eq!(
            accents,
            vec![
                TrainingAccent::Strong,
                TrainingAccent::Normal,
                TrainingAccent::Weak,
                TrainingAccent::None,
                TrainingAccent::Normal,
                TrainingAccent::Strong,
                TrainingAccent::Normal,
                TrainingAccent::Weak,
            ]
        );
        assert_eq!(step.clicks[6].bpm, 90);
        assert_eq!(step.clicks[6].denominator, Denominator::EIGHTH);
        assert_eq!(step.voices[0].len(), 8);
    }

    #[test]
    fn test_tempo_program_applies_per_step() {
        let program = TempoChangeProgram {
            mode: LoopMode::Accelerate,
            tempo_step: 10,
            min_tempo: 60,
            max_tempo: 140,
            loop_change_count: 1,
            loop_repeat_limit: 1,
            count_in: false,
        };
        let compiled = compile(&single_bar(), &program).unwrap();
        let bpms: Vec<u32> = compiled.steps.iter().map(|s| s.clicks[0].bpm).collect();
        assert_eq!(bpms, vec![120, 130, 140]);
        assert_eq!(compiled.steps[2].voices[0][0].bpm, 140);
    }

    #[test]
    fn test_count_in_inserted_at_tempo_changes() {
        let mut map = single_bar();
        map.set_accent(1, TrainingAccent::Weak).unwrap();
        let program = TempoChangeProgram {
            mode: LoopMode::Accelerate,
            tempo_step: 10,
            min_tempo: 60,
            max_tempo: 140,
            loop_change_count: 2,
            loop_repeat_limit: 1,
            count_in: true,
        };
        let compiled = compile(&map, &program).unwrap();
        // 120 120 | ci 130 130 | ci 140 140
        assert_eq!(compiled.len(), 8);
        assert_eq!(compiled.count_ins(), 2);
        let count_in = &compiled.steps[2];
        assert!(count_in.is_count_in());
        assert_eq!(count_in.clicks.len(), 4);
        assert_eq!(count_in.clicks[0].accent, TrainingAccent::Bell);
        assert_eq!(count_in.clicks[1].accent, TrainingAccent::Weak);
        assert_eq!(count_in.clicks[0].bpm, 130);
        assert!(count_in.voices[0].iter().all(|e| e.volume == 0.0));
        assert_eq!(count_in.voices[0].len(), 4);
        assert_eq!(compiled.steps[3].kind, StepKind::Regular { loop_index: 2 });
    }

    #[test]
    fn test_no_count_in_in_endless_mode() {
        let program = TempoChangeProgram {
            count_in: true,
            loop_change_count: 1,
            ..endless(3)
        };
        let compiled = compile(&single_bar(), &program).unwrap();
        assert_eq!(compiled.count_ins(), 0);
        assert_eq!(compiled.len(), 3);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let map = single_bar();
        let program = TempoChangeProgram {
            mode: LoopMode::RepeatAccelDecel,
            tempo_step: 5,
            min_tempo: 100,
            max_tempo: 140,
            loop_change_count: 2,
            loop_repeat_limit: 2,
            count_in: true,
        };
        assert_eq!(compile(&map, &program), compile(&map, &program));
    }

    #[test]
    fn test_compile_errors() {
        let empty = BeatMap::new();
        assert_eq!(compile(&empty, &endless(1)), Err(CompileError::NoSections));

        let no_parts = BeatMap::with_sections(vec![Section::default()], 0).unwrap();
        assert_eq!(compile(&no_parts, &endless(1)), Err(CompileError::NoParts));

        assert_eq!(compile(&single_bar(), &endless(0)), Err(CompileError::EmptyProgram));

        let bad = TempoChangeProgram {
            mode: LoopMode::Accelerate,
            tempo_step: 0,
            ..TempoChangeProgram::default()
        };
        assert_eq!(
            compile(&single_bar(), &bad),
            Err(CompileError::TempoProgram(TempoProgramError::ZeroStep))
        );
    }
}
