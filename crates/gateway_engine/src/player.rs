//! Player-specific entity state and its roster presentation.
//!
//! Every player gets a roster entry before its first spawn, since clients
//! render skins from the roster. Players that should not be listed then have
//! their entry withdrawn by a deferred action.

use gateway_entity::TargetId;
use gateway_protocol::{GameProfile, RosterEntry, TargetPacket};
use tracing::debug;

use crate::context::SessionContext;
use crate::effects::EffectCache;
use crate::scheduler::DeferredAction;
use crate::synthesizer::ShoulderSlots;

/// State only players carry.
#[derive(Debug)]
pub struct PlayerState {
    pub(crate) profile: GameProfile,
    /// Last display name seen on the custom-name field.
    pub(crate) display_name: Option<String>,
    /// Whether the player should stay on the roster surface.
    pub(crate) roster_visible: bool,
    /// Whether a roster entry has been sent since the last withdrawal.
    pub(crate) roster_added: bool,
    pub(crate) effects: EffectCache,
    pub(crate) shoulders: ShoulderSlots,
}

impl PlayerState {
    #[must_use]
    pub fn new(profile: GameProfile, roster_visible: bool) -> Self {
        Self {
            profile,
            display_name: None,
            roster_visible,
            roster_added: false,
            effects: EffectCache::new(),
            shoulders: ShoulderSlots::default(),
        }
    }

    #[must_use]
    pub fn profile(&self) -> &GameProfile {
        &self.profile
    }

    /// The name used for team lookup: the custom name if one was set, the
    /// profile name otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.profile.name)
    }

    #[must_use]
    pub fn is_roster_visible(&self) -> bool {
        self.roster_visible
    }

    #[must_use]
    pub fn effects(&self) -> &EffectCache {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectCache {
        &mut self.effects
    }

    #[must_use]
    pub fn shoulders(&self) -> &ShoulderSlots {
        &self.shoulders
    }

    /// Send a roster entry with the default appearance, once.
    pub(crate) fn add_to_roster(&mut self, target_id: TargetId, ctx: &SessionContext<'_>) {
        if self.roster_added {
            return;
        }
        ctx.emit(TargetPacket::RosterAdd {
            entries: vec![RosterEntry::with_default_appearance(
                self.profile.id,
                self.profile.name.clone(),
                target_id,
            )],
        });
        self.roster_added = true;
        debug!(%target_id, name = %self.profile.name, "added player to roster");
    }

    /// Withdraw an unlisted player's entry later, so it renders but is never
    /// shown on the roster.
    pub(crate) fn schedule_roster_removal(&self, target_id: TargetId, ctx: &SessionContext<'_>) {
        if self.roster_visible {
            return;
        }
        ctx.scheduler.schedule(
            ctx.config.roster_removal_delay(),
            DeferredAction::RemoveFromRoster {
                target_id,
                uuid: self.profile.id,
            },
        );
    }

    /// Take the player off the roster now. Used when the source withdraws
    /// the profile.
    pub(crate) fn remove_from_roster(&mut self, ctx: &SessionContext<'_>) {
        self.roster_visible = false;
        if self.roster_added {
            self.withdraw_from_roster(ctx);
        }
    }

    /// Send the roster removal and forget that an entry was sent.
    pub(crate) fn withdraw_from_roster(&mut self, ctx: &SessionContext<'_>) {
        ctx.emit(TargetPacket::RosterRemove {
            uuids: vec![self.profile.id],
        });
        self.roster_added = false;
        debug!(name = %self.profile.name, "removed player from roster");
    }

    /// Whether a roster entry is currently shown for this player.
    #[must_use]
    pub fn is_on_roster(&self) -> bool {
        self.roster_added
    }
}
