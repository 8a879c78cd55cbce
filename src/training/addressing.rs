// Beat addressing - section index <-> global beat index <-> local beat index
//
// Global beat index = sum of numerators of all preceding sections + local
// offset. Section repeats (loopCount) do not add slots; they only replay them.

use std::ops::Range;

use super::section::{Beat, Section};

/// Position of a slot inside its section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAddress {
    pub section: usize,
    pub local: usize,
}

/// Number of slots every part must hold
pub fn total_beats(sections: &[Section]) -> usize {
    sections.iter().map(|s| s.numerator as usize).sum()
}

/// Global index of the first slot of `section` (== total when past the end)
pub fn section_start(sections: &[Section], section: usize) -> usize {
    sections
        .iter()
        .take(section)
        .map(|s| s.numerator as usize)
        .sum()
}

/// Global slot range owned by `section`
pub fn section_range(sections: &[Section], section: usize) -> Option<Range<usize>> {
    let numerator = sections.get(section)?.numerator as usize;
    let start = section_start(sections, section);
    Some(start..start + numerator)
}

pub fn global_index(sections: &[Section], section: usize, local: usize) -> Option<usize> {
    let range = section_range(sections, section)?;
    let global = range.start + local;
    range.contains(&global).then_some(global)
}

pub fn locate(sections: &[Section], global: usize) -> Option<SlotAddress> {
    let mut start = 0;
    for (index, section) in sections.iter().enumerate() {
        let end = start + section.numerator as usize;
        if global < end {
            return Some(SlotAddress {
                section: index,
                local: global - start,
            });
        }
        start = end;
    }
    None
}

/// Start slot of the figure covering `global`, if any
pub fn figure_owner(beats: &[Beat], global: usize) -> Option<usize> {
    if global >= beats.len() {
        return None;
    }
    (0..=global)
        .rev()
        .find(|&j| beats[j].is_start)
        .filter(|&j| j + beats[j].span() > global)
}

/// True if some figure starts before `boundary` and ends after it, i.e. the
/// boundary between slot `boundary - 1` and slot `boundary` cuts a figure
pub fn figure_straddles(beats: &[Beat], boundary: usize) -> bool {
    if boundary == 0 || boundary >= beats.len() {
        return false;
    }
    // Only the owner of the slot just after the boundary can cross it
    figure_owner(beats, boundary).is_some_and(|owner| owner < boundary)
}

/// True if any figure in any part crosses into or out of `range`
pub fn range_is_linked<'a>(parts: impl IntoIterator<Item = &'a [Beat]>, range: &Range<usize>) -> bool {
    parts
        .into_iter()
        .any(|beats| figure_straddles(beats, range.start) || figure_straddles(beats, range.end))
}

/// Figure invariant: every slot is a start, or lies within the span of the
/// nearest preceding start
pub fn figures_are_consistent(beats: &[Beat]) -> bool {
    (0..beats.len()).all(|i| beats[i].is_start || figure_owner(beats, i).is_some())
}
