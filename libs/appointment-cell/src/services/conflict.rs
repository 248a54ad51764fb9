use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Appointment;
use crate::services::time_range::TimeRange;

/// Finds appointments that would double-book a professional.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetectionService;

impl ConflictDetectionService {
    pub fn new() -> Self {
        Self
    }

    /// First conflicting appointment by id, or `None` when the slot is free.
    pub fn find_conflict<'a, I>(
        &self,
        appointments: I,
        professional_id: Uuid,
        candidate: &TimeRange,
        exclude_appointment_id: Option<i64>,
    ) -> Option<&'a Appointment>
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        let conflict = appointments
            .into_iter()
            .filter(|existing| self.blocks(existing, professional_id, candidate, exclude_appointment_id))
            .min_by_key(|appointment| appointment.id);

        if let Some(existing) = conflict {
            warn!(
                "Conflict detected for professional {}: appointment {} occupies {} - {}",
                professional_id, existing.id, existing.start_time, existing.end_time
            );
        }

        conflict
    }

    /// Every conflicting appointment, ordered by start time then id.
    pub fn find_conflicts<'a, I>(
        &self,
        appointments: I,
        professional_id: Uuid,
        candidate: &TimeRange,
        exclude_appointment_id: Option<i64>,
    ) -> Vec<&'a Appointment>
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        let mut conflicts: Vec<&'a Appointment> = appointments
            .into_iter()
            .filter(|existing| self.blocks(existing, professional_id, candidate, exclude_appointment_id))
            .collect();
        conflicts.sort_by_key(|appointment| (appointment.start_time, appointment.id));

        debug!(
            "{} conflicting appointments for professional {} in {} - {}",
            conflicts.len(),
            professional_id,
            candidate.start,
            candidate.end
        );

        conflicts
    }

    fn blocks(
        &self,
        existing: &Appointment,
        professional_id: Uuid,
        candidate: &TimeRange,
        exclude_appointment_id: Option<i64>,
    ) -> bool {
        existing.professional_id == professional_id
            && existing.occupies_slot()
            && Some(existing.id) != exclude_appointment_id
            && appointments_overlap(existing.start_time, existing.end_time, candidate.start, candidate.end)
    }
}

/// Half-open interval test: back-to-back ranges do not overlap.
pub fn appointments_overlap(
    start1: DateTime<FixedOffset>,
    end1: DateTime<FixedOffset>,
    start2: DateTime<FixedOffset>,
    end2: DateTime<FixedOffset>,
) -> bool {
    start1 < end2 && start2 < end1
}
