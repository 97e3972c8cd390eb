//! Accountability partnership model and lifecycle transitions.
//!
//! # Responsibility
//! - Define the partnership record linking an ADHD user with a partner.
//! - Generate and validate 6-character invite codes.
//! - Provide pure status transitions (accept/decline/pause/resume/terminate)
//!   and shallow patch merges for settings and stats.
//!
//! # Invariants
//! - `accepted_at` is set only by `accept`; `terminated_at` only by
//!   `terminate`.
//! - Transition functions perform no legal-predecessor checks; the service
//!   layer guards transitions against an explicit table.

use crate::model::task::UserId;
use crate::model::{now_epoch_ms, ValidationReport};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a partnership.
pub type PartnershipId = Uuid;

/// Invite codes draw from uppercase letters and digits.
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Invite code length in characters.
pub const INVITE_CODE_LEN: usize = 6;

static INVITE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{6}$").expect("valid invite code regex"));

/// Partnership lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnershipStatus {
    /// Invite sent, waiting for the other party.
    Pending,
    /// Both parties joined.
    Active,
    /// Invite was rejected. Terminal.
    Declined,
    /// Temporarily suspended by either party.
    Paused,
    /// Ended for good. Terminal and absorbing.
    Terminated,
}

/// What the partner is allowed to do within the partnership.
///
/// Defaults are permissive; the ADHD user narrows them from settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnershipSettings {
    pub can_assign_tasks: bool,
    pub can_view_progress: bool,
    pub can_send_encouragement: bool,
    pub can_send_check_ins: bool,
    /// Local-time window (minutes after midnight) during which reminders
    /// are held back. `None` means no quiet hours.
    pub quiet_hours: Option<QuietHours>,
}

impl Default for PartnershipSettings {
    fn default() -> Self {
        Self {
            can_assign_tasks: true,
            can_view_progress: true,
            can_send_encouragement: true,
            can_send_check_ins: true,
            quiet_hours: None,
        }
    }
}

/// Quiet-hours window in minutes after local midnight. May wrap past
/// midnight (start > end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start_minute: u16,
    pub end_minute: u16,
}

/// Partial update for `PartnershipSettings`; `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub can_assign_tasks: Option<bool>,
    pub can_view_progress: Option<bool>,
    pub can_send_encouragement: Option<bool>,
    pub can_send_check_ins: Option<bool>,
    /// `Some(None)` clears quiet hours; `Some(Some(_))` replaces them.
    pub quiet_hours: Option<Option<QuietHours>>,
}

/// Running counters for the partnership dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartnershipStats {
    pub tasks_assigned: u32,
    pub tasks_completed: u32,
    pub encouragements_sent: u32,
    pub check_ins_completed: u32,
    /// Whole days since the partnership was accepted.
    pub partnership_duration_days: u32,
}

/// Partial update for `PartnershipStats`; `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct StatsPatch {
    pub tasks_assigned: Option<u32>,
    pub tasks_completed: Option<u32>,
    pub encouragements_sent: Option<u32>,
    pub check_ins_completed: Option<u32>,
    pub partnership_duration_days: Option<u32>,
}

/// Creation input for `Partnership::create`.
#[derive(Debug, Clone, Default)]
pub struct NewPartnership {
    pub adhd_user_id: Option<UserId>,
    pub partner_id: Option<UserId>,
    pub invite_sent_by: Option<UserId>,
}

/// Canonical partnership record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partnership {
    pub id: PartnershipId,
    /// The task owner receiving assistance. `None` until the invite from a
    /// partner-side sender is accepted.
    pub adhd_user_id: Option<UserId>,
    /// The accountability partner. `None` until the invite from an
    /// ADHD-side sender is accepted.
    pub partner_id: Option<UserId>,
    pub status: PartnershipStatus,
    /// 6-character uppercase alphanumeric code, exchanged out-of-band.
    pub invite_code: String,
    pub invite_sent_by: Option<UserId>,
    pub settings: PartnershipSettings,
    pub stats: PartnershipStats,
    pub created_at: i64,
    pub updated_at: i64,
    pub accepted_at: Option<i64>,
    pub terminated_at: Option<i64>,
}

impl Partnership {
    /// Creates a pending partnership with a freshly generated invite code.
    ///
    /// Code uniqueness is a storage concern; the persistence service
    /// detects collisions and regenerates.
    pub fn create(input: NewPartnership) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            adhd_user_id: input.adhd_user_id,
            partner_id: input.partner_id,
            status: PartnershipStatus::Pending,
            invite_code: generate_invite_code(),
            invite_sent_by: input.invite_sent_by,
            settings: PartnershipSettings::default(),
            stats: PartnershipStats::default(),
            created_at: now,
            updated_at: now,
            accepted_at: None,
            terminated_at: None,
        }
    }

    /// Validates the typed record before persistence.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        if self.adhd_user_id.is_none() && self.partner_id.is_none() {
            errors.push("Partnership must reference at least one user".to_string());
        }
        if !is_valid_invite_code(&self.invite_code) {
            errors.push("Invite code must be 6 uppercase alphanumeric characters".to_string());
        }
        ValidationReport::from_errors(errors)
    }

    /// Activates the partnership and stamps `accepted_at`.
    pub fn accept(mut self) -> Self {
        let now = now_epoch_ms();
        self.status = PartnershipStatus::Active;
        self.accepted_at = Some(now);
        self.updated_at = now;
        self
    }

    /// Rejects the invite.
    pub fn decline(mut self) -> Self {
        self.status = PartnershipStatus::Declined;
        self.updated_at = now_epoch_ms();
        self
    }

    /// Suspends an active partnership.
    pub fn pause(mut self) -> Self {
        self.status = PartnershipStatus::Paused;
        self.updated_at = now_epoch_ms();
        self
    }

    /// Reactivates a paused partnership.
    pub fn resume(mut self) -> Self {
        self.status = PartnershipStatus::Active;
        self.updated_at = now_epoch_ms();
        self
    }

    /// Ends the partnership and stamps `terminated_at`. Absorbing by
    /// convention; the service-layer guard enforces it.
    pub fn terminate(mut self) -> Self {
        let now = now_epoch_ms();
        self.status = PartnershipStatus::Terminated;
        self.terminated_at = Some(now);
        self.updated_at = now;
        self
    }

    /// Shallow-merges a settings patch.
    pub fn update_settings(mut self, patch: SettingsPatch) -> Self {
        if let Some(value) = patch.can_assign_tasks {
            self.settings.can_assign_tasks = value;
        }
        if let Some(value) = patch.can_view_progress {
            self.settings.can_view_progress = value;
        }
        if let Some(value) = patch.can_send_encouragement {
            self.settings.can_send_encouragement = value;
        }
        if let Some(value) = patch.can_send_check_ins {
            self.settings.can_send_check_ins = value;
        }
        if let Some(window) = patch.quiet_hours {
            self.settings.quiet_hours = window;
        }
        self.updated_at = now_epoch_ms();
        self
    }

    /// Shallow-merges a stats patch.
    pub fn update_stats(mut self, patch: StatsPatch) -> Self {
        if let Some(value) = patch.tasks_assigned {
            self.stats.tasks_assigned = value;
        }
        if let Some(value) = patch.tasks_completed {
            self.stats.tasks_completed = value;
        }
        if let Some(value) = patch.encouragements_sent {
            self.stats.encouragements_sent = value;
        }
        if let Some(value) = patch.check_ins_completed {
            self.stats.check_ins_completed = value;
        }
        if let Some(value) = patch.partnership_duration_days {
            self.stats.partnership_duration_days = value;
        }
        self.updated_at = now_epoch_ms();
        self
    }

    /// Returns the other party relative to `user_id`, when both are known
    /// to the record.
    pub fn counterpart_of(&self, user_id: UserId) -> Option<UserId> {
        if self.adhd_user_id == Some(user_id) {
            self.partner_id
        } else if self.partner_id == Some(user_id) {
            self.adhd_user_id
        } else {
            None
        }
    }

    /// Whether `user_id` occupies either side of the partnership.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.adhd_user_id == Some(user_id) || self.partner_id == Some(user_id)
    }
}

/// Generates a 6-character invite code, each character drawn independently
/// and uniformly from `[A-Z0-9]`.
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            let index = rng.gen_range(0..INVITE_CODE_ALPHABET.len());
            INVITE_CODE_ALPHABET[index] as char
        })
        .collect()
}

/// Checks the invite-code wire format (6 uppercase alphanumerics).
pub fn is_valid_invite_code(code: &str) -> bool {
    INVITE_CODE_RE.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::{generate_invite_code, is_valid_invite_code};

    #[test]
    fn generated_codes_match_wire_format() {
        for _ in 0..64 {
            let code = generate_invite_code();
            assert!(is_valid_invite_code(&code), "bad code: {code}");
        }
    }

    #[test]
    fn format_check_rejects_lowercase_and_wrong_length() {
        assert!(!is_valid_invite_code("abc123"));
        assert!(!is_valid_invite_code("ABC12"));
        assert!(!is_valid_invite_code("ABC1234"));
        assert!(!is_valid_invite_code("ABC-12"));
    }
}
