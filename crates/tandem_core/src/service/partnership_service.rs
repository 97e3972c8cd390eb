//! Partnership use-case service.
//!
//! # Responsibility
//! - Drive the invite workflow (create, accept, decline) and the
//!   pause/resume/terminate lifecycle.
//! - Guard every status change against an explicit allowed-transition
//!   table instead of trusting callers.
//! - Keep the denormalized `User.partner_id` pointers in sync with the
//!   partnership record.
//!
//! # Invariants
//! - Terminated and declined partnerships accept no further transitions.
//! - Membership changes write the partnership record first, then the user
//!   records, to keep the inconsistency window small and ordered.
//! - Invite codes are unique in storage; collisions are regenerated.

use crate::model::notification::NotificationEvent;
use crate::model::partnership::{
    generate_invite_code, NewPartnership, Partnership, PartnershipId, PartnershipStatus,
    SettingsPatch, StatsPatch,
};
use crate::model::task::UserId;
use crate::model::user::{User, UserRole};
use crate::repo::partnership_repo::PartnershipRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::notification_service::NotificationSink;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Attempts before giving up on finding an unclaimed invite code. With a
/// 36^6 space this fires only under storage corruption.
const MAX_INVITE_CODE_ATTEMPTS: u32 = 5;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub type PartnershipServiceResult<T> = Result<T, PartnershipServiceError>;

/// Requested status change, checked against the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnershipAction {
    Accept,
    Decline,
    Pause,
    Resume,
    Terminate,
}

impl Display for PartnershipAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Terminate => "terminate",
        };
        write!(f, "{name}")
    }
}

/// Explicit legal-predecessor table for partnership transitions.
///
/// Declined and terminated are terminal; nothing leaves them.
pub fn transition_allowed(from: PartnershipStatus, action: PartnershipAction) -> bool {
    use PartnershipStatus::*;
    match action {
        PartnershipAction::Accept | PartnershipAction::Decline => from == Pending,
        PartnershipAction::Pause => from == Active,
        PartnershipAction::Resume => from == Paused,
        PartnershipAction::Terminate => matches!(from, Pending | Active | Paused),
    }
}

/// Service error for partnership use-cases.
#[derive(Debug)]
pub enum PartnershipServiceError {
    PartnershipNotFound(PartnershipId),
    UserNotFound(UserId),
    /// No partnership carries this invite code.
    InviteNotFound(String),
    /// The invite exists but is no longer pending.
    InviteNotPending {
        code: String,
        status: PartnershipStatus,
    },
    /// The sender cannot accept their own invite.
    CannotAcceptOwnInvite,
    /// The sender cannot decline their own invite.
    CannotDeclineOwnInvite,
    /// Both party slots are already taken by other users.
    InviteAlreadyClaimed(String),
    /// Could not find an unclaimed invite code.
    InviteCodeExhausted(u32),
    /// The requested action is not legal from the current status.
    InvalidTransition {
        from: PartnershipStatus,
        action: PartnershipAction,
    },
    /// The partnership settings forbid the requested operation.
    NotPermitted(&'static str),
    Repo(RepoError),
}

impl Display for PartnershipServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PartnershipNotFound(id) => write!(f, "partnership not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::InviteNotFound(code) => write!(f, "invite code not found: {code}"),
            Self::InviteNotPending { code, status } => {
                write!(f, "invite {code} is no longer pending (status {status:?})")
            }
            Self::CannotAcceptOwnInvite => write!(f, "cannot accept an invite you sent"),
            Self::CannotDeclineOwnInvite => write!(f, "cannot decline an invite you sent"),
            Self::InviteAlreadyClaimed(code) => write!(f, "invite {code} is already claimed"),
            Self::InviteCodeExhausted(attempts) => {
                write!(f, "no unclaimed invite code after {attempts} attempts")
            }
            Self::InvalidTransition { from, action } => {
                write!(f, "cannot {action} a partnership in status {from:?}")
            }
            Self::NotPermitted(what) => write!(f, "not permitted: {what}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PartnershipServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PartnershipServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Partnership service facade over repositories and dispatch.
pub struct PartnershipService<P, U, N>
where
    P: PartnershipRepository,
    U: UserRepository,
    N: NotificationSink,
{
    partnerships: P,
    users: U,
    notifier: N,
}

impl<P, U, N> PartnershipService<P, U, N>
where
    P: PartnershipRepository,
    U: UserRepository,
    N: NotificationSink,
{
    pub fn new(partnerships: P, users: U, notifier: N) -> Self {
        Self {
            partnerships,
            users,
            notifier,
        }
    }

    /// Creates a pending partnership invite from `sender_id`.
    ///
    /// The sender's role picks the party slot they occupy: partners land on
    /// the partner side, everyone else on the ADHD-user side. The generated
    /// invite code is checked against storage and regenerated on collision.
    pub fn create_invite(&self, sender_id: UserId) -> PartnershipServiceResult<Partnership> {
        let sender = self.require_user(sender_id)?;

        let mut input = NewPartnership {
            invite_sent_by: Some(sender_id),
            ..NewPartnership::default()
        };
        match sender.role {
            UserRole::Partner => input.partner_id = Some(sender_id),
            UserRole::AdhdUser | UserRole::Both => input.adhd_user_id = Some(sender_id),
        }

        let mut partnership = Partnership::create(input);
        let mut attempts = 0;
        while self
            .partnerships
            .get_by_invite_code(&partnership.invite_code)?
            .is_some()
        {
            attempts += 1;
            if attempts >= MAX_INVITE_CODE_ATTEMPTS {
                return Err(PartnershipServiceError::InviteCodeExhausted(attempts));
            }
            debug!(
                "event=invite_code_collision module=partnership status=retry attempt={attempts}"
            );
            partnership.invite_code = generate_invite_code();
        }

        self.partnerships.save(&partnership)?;
        info!(
            "event=invite_created module=partnership status=ok partnership={} sender={sender_id}",
            partnership.id
        );
        Ok(partnership)
    }

    /// Redeems an invite code for `user_id`.
    ///
    /// The partnership record is written before the two user records so a
    /// crash between the writes leaves the authoritative side consistent.
    pub fn accept_invite(
        &self,
        code: &str,
        user_id: UserId,
    ) -> PartnershipServiceResult<Partnership> {
        let code = code.trim().to_ascii_uppercase();
        let mut partnership = self
            .partnerships
            .get_by_invite_code(&code)?
            .ok_or_else(|| PartnershipServiceError::InviteNotFound(code.clone()))?;

        if !transition_allowed(partnership.status, PartnershipAction::Accept) {
            return Err(PartnershipServiceError::InviteNotPending {
                code,
                status: partnership.status,
            });
        }
        if partnership.invite_sent_by == Some(user_id) {
            return Err(PartnershipServiceError::CannotAcceptOwnInvite);
        }

        if !partnership.involves(user_id) {
            if partnership.partner_id.is_none() {
                partnership.partner_id = Some(user_id);
            } else if partnership.adhd_user_id.is_none() {
                partnership.adhd_user_id = Some(user_id);
            } else {
                return Err(PartnershipServiceError::InviteAlreadyClaimed(code));
            }
        }

        let partnership = partnership.accept();
        self.partnerships.update(&partnership)?;
        self.sync_partner_pointers(&partnership);

        info!(
            "event=invite_accepted module=partnership status=ok partnership={} user={user_id}",
            partnership.id
        );
        Ok(partnership)
    }

    /// Declines a pending invite on behalf of `user_id`.
    ///
    /// The sender cannot decline their own invite through this path; invite
    /// withdrawal is a separate concern.
    pub fn decline_invite(
        &self,
        code: &str,
        user_id: UserId,
    ) -> PartnershipServiceResult<Partnership> {
        let code = code.trim().to_ascii_uppercase();
        let partnership = self
            .partnerships
            .get_by_invite_code(&code)?
            .ok_or_else(|| PartnershipServiceError::InviteNotFound(code.clone()))?;

        if !transition_allowed(partnership.status, PartnershipAction::Decline) {
            return Err(PartnershipServiceError::InviteNotPending {
                code,
                status: partnership.status,
            });
        }
        if partnership.invite_sent_by == Some(user_id) {
            return Err(PartnershipServiceError::CannotDeclineOwnInvite);
        }

        let partnership = partnership.decline();
        self.partnerships.update(&partnership)?;
        info!(
            "event=invite_declined module=partnership status=ok partnership={} user={user_id}",
            partnership.id
        );
        Ok(partnership)
    }

    /// Suspends an active partnership.
    pub fn pause(&self, id: PartnershipId) -> PartnershipServiceResult<Partnership> {
        self.transition(id, PartnershipAction::Pause, Partnership::pause)
    }

    /// Reactivates a paused partnership.
    pub fn resume(&self, id: PartnershipId) -> PartnershipServiceResult<Partnership> {
        self.transition(id, PartnershipAction::Resume, Partnership::resume)
    }

    /// Ends the partnership and clears both users' partner pointers.
    pub fn terminate(&self, id: PartnershipId) -> PartnershipServiceResult<Partnership> {
        let partnership = self.transition(id, PartnershipAction::Terminate, Partnership::terminate)?;

        for member in [partnership.adhd_user_id, partnership.partner_id]
            .into_iter()
            .flatten()
        {
            match self.users.get_by_id(member) {
                Ok(Some(user)) if user.partner_id.is_some() => {
                    let user = user.set_partner(None);
                    if let Err(err) = self.users.update(&user) {
                        warn!(
                            "event=partner_pointer_sync module=partnership status=error user={member} error={err}"
                        );
                    }
                }
                Ok(_) => {}
                Err(err) => warn!(
                    "event=partner_pointer_sync module=partnership status=error user={member} error={err}"
                ),
            }
        }

        Ok(partnership)
    }

    /// Applies a settings patch.
    pub fn update_settings(
        &self,
        id: PartnershipId,
        patch: SettingsPatch,
    ) -> PartnershipServiceResult<Partnership> {
        let partnership = self.require_partnership(id)?.update_settings(patch);
        self.partnerships.update(&partnership)?;
        Ok(partnership)
    }

    /// Records a partner check-in and notifies the other party.
    pub fn record_check_in(
        &self,
        id: PartnershipId,
        from_user_id: UserId,
    ) -> PartnershipServiceResult<Partnership> {
        let partnership = self.require_partnership(id)?;
        if !partnership.involves(from_user_id) {
            return Err(PartnershipServiceError::NotPermitted(
                "user is not a member of this partnership",
            ));
        }
        if partnership.status != PartnershipStatus::Active {
            return Err(PartnershipServiceError::NotPermitted(
                "partnership is not active",
            ));
        }
        if !partnership.settings.can_send_check_ins {
            return Err(PartnershipServiceError::NotPermitted(
                "check-ins are disabled for this partnership",
            ));
        }

        let check_ins = partnership.stats.check_ins_completed + 1;
        let partnership = partnership.update_stats(StatsPatch {
            check_ins_completed: Some(check_ins),
            ..StatsPatch::default()
        });
        self.partnerships.update(&partnership)?;

        if let Some(recipient_id) = partnership.counterpart_of(from_user_id) {
            let actor_name = self.display_name(from_user_id);
            self.notifier.notify(NotificationEvent::CheckIn {
                recipient_id,
                actor_name,
            });
        }

        Ok(partnership)
    }

    /// Recomputes `partnership_duration_days` against the supplied clock.
    pub fn refresh_duration(
        &self,
        id: PartnershipId,
        now_ms: i64,
    ) -> PartnershipServiceResult<Partnership> {
        let partnership = self.require_partnership(id)?;
        let Some(accepted_at) = partnership.accepted_at else {
            return Ok(partnership);
        };

        let days = ((now_ms - accepted_at).max(0) / MS_PER_DAY) as u32;
        let partnership = partnership.update_stats(StatsPatch {
            partnership_duration_days: Some(days),
            ..StatsPatch::default()
        });
        self.partnerships.update(&partnership)?;
        Ok(partnership)
    }

    /// Looks up one partnership by id.
    pub fn get(&self, id: PartnershipId) -> PartnershipServiceResult<Option<Partnership>> {
        Ok(self.partnerships.get_by_id(id)?)
    }

    /// All partnerships `user_id` participates in.
    pub fn list_for_user(&self, user_id: UserId) -> PartnershipServiceResult<Vec<Partnership>> {
        Ok(self.partnerships.get_all_for_user(user_id)?)
    }

    fn transition(
        &self,
        id: PartnershipId,
        action: PartnershipAction,
        apply: fn(Partnership) -> Partnership,
    ) -> PartnershipServiceResult<Partnership> {
        let partnership = self.require_partnership(id)?;
        if !transition_allowed(partnership.status, action) {
            return Err(PartnershipServiceError::InvalidTransition {
                from: partnership.status,
                action,
            });
        }
        let partnership = apply(partnership);
        self.partnerships.update(&partnership)?;
        info!(
            "event=partnership_transition module=partnership status=ok action={action} partnership={id}"
        );
        Ok(partnership)
    }

    fn require_partnership(&self, id: PartnershipId) -> PartnershipServiceResult<Partnership> {
        self.partnerships
            .get_by_id(id)?
            .ok_or(PartnershipServiceError::PartnershipNotFound(id))
    }

    fn require_user(&self, id: UserId) -> PartnershipServiceResult<User> {
        self.users
            .get_by_id(id)?
            .ok_or(PartnershipServiceError::UserNotFound(id))
    }

    /// Mirrors accepted membership into both users' `partner_id`.
    ///
    /// Pointer sync is best-effort: a failed user write is logged, not
    /// propagated, since the partnership record is authoritative.
    fn sync_partner_pointers(&self, partnership: &Partnership) {
        let pairs = [
            (partnership.adhd_user_id, partnership.partner_id),
            (partnership.partner_id, partnership.adhd_user_id),
        ];
        for (member, counterpart) in pairs {
            let Some(member) = member else { continue };
            match self.users.get_by_id(member) {
                Ok(Some(user)) => {
                    let user = user.set_partner(counterpart);
                    if let Err(err) = self.users.update(&user) {
                        warn!(
                            "event=partner_pointer_sync module=partnership status=error user={member} error={err}"
                        );
                    }
                }
                Ok(None) => warn!(
                    "event=partner_pointer_sync module=partnership status=error reason=user_missing user={member}"
                ),
                Err(err) => warn!(
                    "event=partner_pointer_sync module=partnership status=error user={member} error={err}"
                ),
            }
        }
    }

    fn display_name(&self, user_id: UserId) -> String {
        match self.users.get_by_id(user_id) {
            Ok(Some(user)) => user.name,
            _ => "Your partner".to_string(),
        }
    }
}
