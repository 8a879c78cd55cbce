// Beat map - sections, per-part beat slots and the accent list
//
// Invariants kept by every operation:
// - every part holds exactly total_beats(sections) slots, and so does the accent list
// - every continuation slot lies inside the span of the nearest preceding start
// - a figure never runs past the last section, and every section it spans
//   shares the starting section's bpm, note value and denominator
//
// Every operation validates first and mutates only once all checks passed.

use serde::{Deserialize, Serialize};

use super::addressing::{
    figure_owner, figure_straddles, figures_are_consistent, global_index, locate,
    range_is_linked, section_range, total_beats,
};
use super::section::{Beat, MAX_PARTS, Part, PulseField, Section};
use crate::sequencer::live::MAX_UNIT_SUBDIVISIONS;
use crate::sequencer::accent::TrainingAccent;
use crate::sequencer::timeline::{Denominator, MAX_NUMERATOR, NoteValue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BeatMapError {
    #[error("section {0} does not exist")]
    SectionOutOfRange(usize),

    #[error("part {0} does not exist")]
    PartOutOfRange(usize),

    #[error("beat {beat} is outside section {section}")]
    BeatOutOfRange { section: usize, beat: usize },

    #[error("beat slot {0} does not exist")]
    SlotOutOfRange(usize),

    #[error("numerator must be between 1 and 20, got {0}")]
    NumeratorOutOfRange(u8),

    #[error("a tied figure crosses the boundary of section {0}")]
    FigureCrossesBoundary(usize),

    #[error("the {n}-beat figure starting at beat slot {start} does not fit before the last section ends")]
    FigureOverflow { start: usize, n: u8 },

    #[error("the sections spanned by the figure at beat slot {0} have different BPM")]
    TempoMismatch(usize),

    #[error("the sections spanned by the figure at beat slot {0} have different note values")]
    NoteValueMismatch(usize),

    #[error("the sections spanned by the figure at beat slot {0} have different denominators")]
    DenominatorMismatch(usize),

    #[error("the figure at beat slot {0} spans a section that repeats")]
    FigureInRepeatedSection(usize),

    #[error("beat slot {0} continues an earlier figure; edit the figure's first beat instead")]
    ContinuationSlot(usize),

    #[error("invalid figure {n}/{m}: n must be at least 1 and m between 1 and 32")]
    InvalidFigure { n: u8, m: u8 },

    #[error("tempo must be at least 1 BPM")]
    InvalidTempo,

    #[error("loop count must be at least 1")]
    InvalidLoopCount,

    #[error("at most 4 parts are supported")]
    TooManyParts,

    #[error("section {0} is tied to a neighbouring section")]
    LinkedSection(usize),

    #[error("imported section is {imported}, target section is {target}")]
    MeterMismatch { imported: String, target: String },

    #[error("malformed beat data: {0}")]
    ImportShape(String),
}

/// Single-section exchange format: `{sections: [section], parts: [{beats}], accentList}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSnapshot {
    pub sections: Vec<Section>,
    pub parts: Vec<Part>,
    #[serde(default)]
    pub accent_list: Vec<TrainingAccent>,
}

impl SectionSnapshot {
    /// `<numerator>_<denominator>_<bpm>_<name>.json`
    pub fn suggested_filename(&self) -> String {
        match self.sections.first() {
            Some(section) => format!(
                "{}_{}_{}_{}.json",
                section.numerator,
                section.denominator,
                section.bpm,
                sanitize_file_stem(section.display_name())
            ),
            None => "section.json".to_string(),
        }
    }
}

/// Replace characters that are not allowed in file names
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

/// Rewrite placeholder slots covered by a preceding figure as continuations
/// and turn orphan continuations back into placeholders
pub fn normalize_figures(beats: &mut [Beat]) {
    let mut i = 0;
    while i < beats.len() {
        if beats[i].is_start {
            let end = (i + beats[i].span()).min(beats.len());
            for slot in &mut beats[i + 1..end] {
                *slot = Beat::continuation();
            }
            i = end;
        } else {
            beats[i] = Beat::placeholder();
            i += 1;
        }
    }
}

/// Check that the `n`-beat figure starting at global slot `start` fits and
/// keeps a constant pulse
fn check_figure_span(sections: &[Section], start: usize, n: u8) -> Result<(), BeatMapError> {
    let last = start + n.max(1) as usize - 1;
    if last >= total_beats(sections) {
        return Err(BeatMapError::FigureOverflow { start, n });
    }
    let first = locate(sections, start)
        .ok_or(BeatMapError::SlotOutOfRange(start))?
        .section;
    let end = locate(sections, last)
        .ok_or(BeatMapError::SlotOutOfRange(last))?
        .section;

    let base = &sections[first];
    let spanned = &sections[first..=end];
    if let Some(field) = spanned.iter().find_map(|s| s.pulse_difference(base)) {
        return Err(match field {
            PulseField::Tempo => BeatMapError::TempoMismatch(start),
            PulseField::NoteValue => BeatMapError::NoteValueMismatch(start),
            PulseField::Denominator => BeatMapError::DenominatorMismatch(start),
        });
    }
    if end > first && spanned.iter().any(|s| s.loop_count > 1) {
        return Err(BeatMapError::FigureInRepeatedSection(start));
    }
    Ok(())
}

fn check_all_figures(sections: &[Section], parts: &[Part]) -> Result<(), BeatMapError> {
    for part in parts {
        for (start, beat) in part.beats.iter().enumerate() {
            if beat.is_start && beat.n > 1 {
                check_figure_span(sections, start, beat.n)?;
            }
        }
    }
    Ok(())
}

/// Editable training configuration: sections, parts and accent list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeatMap {
    sections: Vec<Section>,
    parts: Vec<Part>,
    accents: Vec<TrainingAccent>,
}

impl BeatMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sections with `part_count` empty parts
    pub fn with_sections(sections: Vec<Section>, part_count: usize) -> Result<Self, BeatMapError> {
        if part_count > MAX_PARTS {
            return Err(BeatMapError::TooManyParts);
        }
        if let Some(bad) = sections
            .iter()
            .find(|s| !(1..=MAX_NUMERATOR).contains(&s.numerator))
        {
            return Err(BeatMapError::NumeratorOutOfRange(bad.numerator));
        }
        let total = total_beats(&sections);
        let parts = (0..part_count)
            .map(|i| Part::new(format!("Part {}", i + 1), total))
            .collect();
        Ok(Self {
            sections,
            parts,
            accents: vec![TrainingAccent::Normal; total],
        })
    }

    /// Build from loaded data: figures are normalized, the accent list is
    /// padded with `normal` (or truncated) to the beat count, and the result
    /// is validated
    pub fn from_parts(
        sections: Vec<Section>,
        mut parts: Vec<Part>,
        mut accents: Vec<TrainingAccent>,
    ) -> Result<Self, BeatMapError> {
        if parts.len() > MAX_PARTS {
            return Err(BeatMapError::TooManyParts);
        }
        let total = total_beats(&sections);
        for (index, part) in parts.iter_mut().enumerate() {
            if part.beats.len() != total {
                return Err(BeatMapError::ImportShape(format!(
                    "part {} has {} beats, expected {}",
                    index + 1,
                    part.beats.len(),
                    total
                )));
            }
            normalize_figures(&mut part.beats);
        }
        accents.resize(total, TrainingAccent::Normal);

        let map = Self {
            sections,
            parts,
            accents,
        };
        map.check_invariants()?;
        Ok(map)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn accents(&self) -> &[TrainingAccent] {
        &self.accents
    }

    pub fn total_beats(&self) -> usize {
        total_beats(&self.sections)
    }

    pub fn into_parts(self) -> (Vec<Section>, Vec<Part>, Vec<TrainingAccent>) {
        (self.sections, self.parts, self.accents)
    }

    /// Verify every structural invariant of the map
    pub fn check_invariants(&self) -> Result<(), BeatMapError> {
        let total = self.total_beats();
        for (index, part) in self.parts.iter().enumerate() {
            if part.beats.len() != total {
                return Err(BeatMapError::ImportShape(format!(
                    "part {} has {} beats, expected {}",
                    index + 1,
                    part.beats.len(),
                    total
                )));
            }
            if !figures_are_consistent(&part.beats) {
                return Err(BeatMapError::ImportShape(format!(
                    "part {} has a continuation beat outside any figure",
                    index + 1
                )));
            }
        }
        if self.accents.len() != total {
            return Err(BeatMapError::ImportShape(format!(
                "accent list has {} entries, expected {}",
                self.accents.len(),
                total
            )));
        }
        if let Some(bad) = self.sections.iter().find(|s| s.loop_count == 0) {
            return Err(BeatMapError::ImportShape(format!(
                "section {} has a loop count of 0",
                bad.display_name()
            )));
        }
        check_all_figures(&self.sections, &self.parts)
    }

    fn range_of(&self, section: usize) -> Result<std::ops::Range<usize>, BeatMapError> {
        section_range(&self.sections, section).ok_or(BeatMapError::SectionOutOfRange(section))
    }

    fn is_linked(&self, range: &std::ops::Range<usize>) -> bool {
        range_is_linked(self.parts.iter().map(|p| p.beats.as_slice()), range)
    }

    // ---- section list ----

    /// Append a section copying the last section's meter and tempo
    /// (4/4, quarter, 120 bpm when the list is empty). Returns its index.
    pub fn add_section(&mut self) -> usize {
        let section = match self.sections.last() {
            Some(last) => Section {
                name: None,
                description: String::new(),
                ..last.clone()
            },
            None => Section::default(),
        };
        let count = section.numerator as usize;
        self.sections.push(section);
        for part in &mut self.parts {
            part.beats
                .extend(std::iter::repeat_n(Beat::placeholder(), count));
        }
        self.accents
            .extend(std::iter::repeat_n(TrainingAccent::Normal, count));
        self.sections.len() - 1
    }

    /// Grow or shrink a section. Slots are inserted or removed at the
    /// section's tail in every part; rejected when a tied figure would be cut.
    pub fn update_section_numerator(
        &mut self,
        index: usize,
        numerator: u8,
    ) -> Result<(), BeatMapError> {
        let range = self.range_of(index)?;
        if !(1..=MAX_NUMERATOR).contains(&numerator) {
            return Err(BeatMapError::NumeratorOutOfRange(numerator));
        }
        let old = self.sections[index].numerator as usize;
        let new = numerator as usize;
        if new == old {
            return Ok(());
        }

        let new_end = range.start + new;
        let cut = |beats: &[Beat]| {
            figure_straddles(beats, range.end)
                || (new < old && figure_straddles(beats, new_end))
        };
        if self.parts.iter().any(|p| cut(&p.beats)) {
            return Err(BeatMapError::FigureCrossesBoundary(index));
        }

        if new > old {
            let added = new - old;
            for part in &mut self.parts {
                part.beats.splice(
                    range.end..range.end,
                    std::iter::repeat_n(Beat::placeholder(), added),
                );
            }
            self.accents.splice(
                range.end..range.end,
                std::iter::repeat_n(TrainingAccent::Normal, added),
            );
        } else {
            for part in &mut self.parts {
                part.beats.drain(new_end..range.end);
            }
            self.accents.drain(new_end..range.end);
        }
        self.sections[index].numerator = numerator;
        Ok(())
    }

    /// Append a deep copy of a section (named `<name>_copy`) and its slots.
    /// Returns the new section's index.
    pub fn duplicate_section(&mut self, index: usize) -> Result<usize, BeatMapError> {
        let range = self.range_of(index)?;
        if self.is_linked(&range) {
            return Err(BeatMapError::FigureCrossesBoundary(index));
        }

        let mut copy = self.sections[index].clone();
        copy.name = copy.name.map(|name| format!("{}_copy", name));
        self.sections.push(copy);
        for part in &mut self.parts {
            let slice = part.beats[range.clone()].to_vec();
            part.beats.extend(slice);
        }
        let accents = self.accents[range].to_vec();
        self.accents.extend(accents);
        Ok(self.sections.len() - 1)
    }

    /// Remove a section and its slots. Rejected when a figure is tied across
    /// either of its boundaries.
    pub fn remove_section(&mut self, index: usize) -> Result<Section, BeatMapError> {
        let range = self.range_of(index)?;
        if self.is_linked(&range) {
            return Err(BeatMapError::FigureCrossesBoundary(index));
        }
        for part in &mut self.parts {
            part.beats.drain(range.clone());
        }
        self.accents.drain(range);
        Ok(self.sections.remove(index))
    }

    pub fn set_section_name(
        &mut self,
        index: usize,
        name: Option<String>,
    ) -> Result<(), BeatMapError> {
        self.range_of(index)?;
        self.sections[index].name = name;
        Ok(())
    }

    pub fn set_section_description(
        &mut self,
        index: usize,
        description: impl Into<String>,
    ) -> Result<(), BeatMapError> {
        self.range_of(index)?;
        self.sections[index].description = description.into();
        Ok(())
    }

    pub fn set_section_bpm(&mut self, index: usize, bpm: u32) -> Result<(), BeatMapError> {
        if bpm == 0 {
            return Err(BeatMapError::InvalidTempo);
        }
        self.edit_section_pulse(index, |s| s.bpm = bpm)
    }

    pub fn set_section_note_value(
        &mut self,
        index: usize,
        note_value: NoteValue,
    ) -> Result<(), BeatMapError> {
        self.edit_section_pulse(index, |s| s.note_value = note_value)
    }

    pub fn set_section_denominator(
        &mut self,
        index: usize,
        denominator: Denominator,
    ) -> Result<(), BeatMapError> {
        self.edit_section_pulse(index, |s| s.denominator = denominator)
    }

    pub fn set_section_loop_count(
        &mut self,
        index: usize,
        loop_count: u32,
    ) -> Result<(), BeatMapError> {
        if loop_count == 0 {
            return Err(BeatMapError::InvalidLoopCount);
        }
        self.edit_section_pulse(index, |s| s.loop_count = loop_count)
    }

    /// Apply an edit that may break tied figures, keeping it only if every
    /// figure still has a constant pulse
    fn edit_section_pulse<F>(&mut self, index: usize, edit: F) -> Result<(), BeatMapError>
    where
        F: FnOnce(&mut Section),
    {
        self.range_of(index)?;
        let mut candidate = self.sections.clone();
        edit(&mut candidate[index]);
        check_all_figures(&candidate, &self.parts)?;
        self.sections = candidate;
        Ok(())
    }

    // ---- parts ----

    pub fn add_part(&mut self, label: impl Into<String>) -> Result<usize, BeatMapError> {
        if self.parts.len() >= MAX_PARTS {
            return Err(BeatMapError::TooManyParts);
        }
        self.parts.push(Part::new(label, self.total_beats()));
        Ok(self.parts.len() - 1)
    }

    pub fn remove_part(&mut self, index: usize) -> Result<Part, BeatMapError> {
        if index >= self.parts.len() {
            return Err(BeatMapError::PartOutOfRange(index));
        }
        Ok(self.parts.remove(index))
    }

    /// Write an `n`-beat, `m`-subdivision figure at `beat` of `section` in
    /// `part`.
    ///
    /// The figure may run into following sections as long as they share the
    /// starting section's pulse. Slots `1..n` become continuations; slots the
    /// previous figures covered beyond the new span revert to placeholders.
    pub fn save_beat(
        &mut self,
        section: usize,
        beat: usize,
        part: usize,
        figure: Beat,
    ) -> Result<(), BeatMapError> {
        self.range_of(section)?;
        let start = global_index(&self.sections, section, beat)
            .ok_or(BeatMapError::BeatOutOfRange { section, beat })?;
        let beats = &self
            .parts
            .get(part)
            .ok_or(BeatMapError::PartOutOfRange(part))?
            .beats;

        let (n, m) = (figure.n, figure.m);
        if n == 0 || m == 0 || m > MAX_UNIT_SUBDIVISIONS {
            return Err(BeatMapError::InvalidFigure { n, m });
        }
        if !beats[start].is_start {
            return Err(BeatMapError::ContinuationSlot(start));
        }
        check_figure_span(&self.sections, start, n)?;

        let new_end = start + n as usize;
        let clear_end = (start..new_end)
            .filter(|&j| beats[j].is_start)
            .map(|j| j + beats[j].span())
            .fold(new_end, usize::max)
            .min(beats.len());

        let beats = &mut self.parts[part].beats;
        beats[start] = Beat::figure(n, m, figure.sound, figure.volumes);
        for slot in &mut beats[start + 1..new_end] {
            *slot = Beat::continuation();
        }
        for slot in &mut beats[new_end..clear_end] {
            *slot = Beat::placeholder();
        }
        Ok(())
    }

    /// Figure start slot covering a global beat slot of a part
    pub fn figure_at(&self, part: usize, global: usize) -> Option<(usize, &Beat)> {
        let beats = &self.parts.get(part)?.beats;
        figure_owner(beats, global).map(|start| (start, &beats[start]))
    }

    // ---- accents ----

    pub fn set_accent(&mut self, global: usize, accent: TrainingAccent) -> Result<(), BeatMapError> {
        let slot = self
            .accents
            .get_mut(global)
            .ok_or(BeatMapError::SlotOutOfRange(global))?;
        *slot = accent;
        Ok(())
    }

    /// Cycle the accent of a global beat slot, returning the new level
    pub fn toggle_accent(&mut self, global: usize) -> Result<TrainingAccent, BeatMapError> {
        let slot = self
            .accents
            .get_mut(global)
            .ok_or(BeatMapError::SlotOutOfRange(global))?;
        *slot = slot.next();
        Ok(*slot)
    }

    // ---- single-section exchange ----

    pub fn export_section(&self, index: usize) -> Result<SectionSnapshot, BeatMapError> {
        let range = self.range_of(index)?;
        if self.is_linked(&range) {
            return Err(BeatMapError::LinkedSection(index));
        }
        Ok(SectionSnapshot {
            sections: vec![self.sections[index].clone()],
            parts: self
                .parts
                .iter()
                .map(|p| Part {
                    label: p.label.clone(),
                    beats: p.beats[range.clone()].to_vec(),
                })
                .collect(),
            accent_list: self.accents[range].to_vec(),
        })
    }

    /// Replace a section's settings and slots with imported data.
    ///
    /// The target must not be tied to its neighbours and must have the same
    /// numerator and denominator. Parts missing from the import keep their
    /// slots; extra imported parts are ignored.
    pub fn import_section(
        &mut self,
        index: usize,
        data: SectionSnapshot,
    ) -> Result<(), BeatMapError> {
        let range = self.range_of(index)?;
        if self.is_linked(&range) {
            return Err(BeatMapError::LinkedSection(index));
        }
        let [imported] = <[Section; 1]>::try_from(data.sections).map_err(|sections| {
            BeatMapError::ImportShape(format!("expected one section, found {}", sections.len()))
        })?;
        let target = &self.sections[index];
        if imported.numerator != target.numerator || imported.denominator != target.denominator {
            return Err(BeatMapError::MeterMismatch {
                imported: format!("{}/{}", imported.numerator, imported.denominator),
                target: format!("{}/{}", target.numerator, target.denominator),
            });
        }
        if imported.loop_count == 0 {
            return Err(BeatMapError::InvalidLoopCount);
        }

        let count = range.len();
        let mut parts = self.parts.clone();
        for (i, (part, incoming)) in parts.iter_mut().zip(data.parts).enumerate() {
            let mut beats = incoming.beats;
            if beats.len() != count {
                return Err(BeatMapError::ImportShape(format!(
                    "part {} has {} beats, expected {}",
                    i + 1,
                    beats.len(),
                    count
                )));
            }
            normalize_figures(&mut beats);
            if let Some(start) = beats.iter().enumerate().position(|(j, b)| j + b.span() > count) {
                return Err(BeatMapError::FigureOverflow {
                    start: range.start + start,
                    n: beats[start].n,
                });
            }
            part.beats.splice(range.clone(), beats);
        }

        let mut accents = data.accent_list;
        accents.resize(count, TrainingAccent::Normal);

        let mut sections = self.sections.clone();
        sections[index] = imported;
        check_all_figures(&sections, &parts)?;

        self.sections = sections;
        self.parts = parts;
        self.accents.splice(range, accents);
        Ok(())
    }
}
