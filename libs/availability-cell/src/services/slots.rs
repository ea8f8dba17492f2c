use shared_utils::time::TimeOfDay;

/// Candidate start times `window_start, window_start + g, ...` strictly
/// before `window_end`. Clone to restart.
#[derive(Debug, Clone)]
pub struct CandidateSlots {
    next: u16,
    end: u16,
    granularity: u16,
}

pub fn generate_candidate_slots(
    window_start: TimeOfDay,
    window_end: TimeOfDay,
    granularity_minutes: u16,
) -> CandidateSlots {
    CandidateSlots {
        next: window_start.minutes(),
        end: window_end.minutes(),
        granularity: granularity_minutes,
    }
}

impl Iterator for CandidateSlots {
    type Item = TimeOfDay;

    fn next(&mut self) -> Option<Self::Item> {
        if self.granularity == 0 || self.next >= self.end {
            return None;
        }
        let current = TimeOfDay::from_minutes(self.next).ok()?;
        self.next = self.next.saturating_add(self.granularity);
        Some(current)
    }
}
