//! In-memory rally roster.
//!
//! The store lives for the lifetime of the process; nothing is written to disk
//! and a restart forgets every rally.

use std::collections::HashMap;

use crate::errors::{RallyError, RallyResult};
use crate::models::participant::{Participant, TroopProfile};
use crate::models::rally::{Rally, RallyDraft, RallyId, VoiceLink};

#[derive(Debug, Default)]
pub struct RosterStore {
    rallies: HashMap<RallyId, Rally>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new rally under `id`. The creator is enrolled immediately.
    ///
    /// # Errors
    ///
    /// `DuplicateRally` if a rally with this id already exists.
    pub fn create(&mut self, id: RallyId, draft: RallyDraft) -> RallyResult<&Rally> {
        if self.rallies.contains_key(&id) {
            return Err(RallyError::DuplicateRally(id));
        }

        let rally = self.rallies.entry(id).or_insert(Rally::from_draft(id, draft));
        Ok(rally)
    }

    /// Add `user_id` to the roster. Returns `false` if they were already on it.
    pub fn join(&mut self, id: RallyId, user_id: u64) -> RallyResult<bool> {
        let rally = self.get_mut(id)?;

        if rally.has_participant(user_id) {
            return Ok(false);
        }

        rally.participants.push(Participant::new(user_id));
        Ok(true)
    }

    /// Remove `user_id` from the roster. Returns `false` if they were not on it.
    pub fn leave(&mut self, id: RallyId, user_id: u64) -> RallyResult<bool> {
        let rally = self.get_mut(id)?;
        let before = rally.participants.len();
        rally.participants.retain(|p| p.user_id != user_id);
        Ok(rally.participants.len() != before)
    }

    pub fn get(&self, id: RallyId) -> RallyResult<&Rally> {
        self.rallies.get(&id).ok_or(RallyError::NotFound(id))
    }

    /// Store the troop profile of someone already on the roster, keeping their position.
    pub fn set_profile(&mut self, id: RallyId, user_id: u64, profile: TroopProfile) -> RallyResult<()> {
        let rally = self.get_mut(id)?;
        let participant = rally
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| RallyError::Validation("You are not on this rally's roster.".to_string()))?;

        participant.profile = Some(profile);
        Ok(())
    }

    pub fn attach_voice(&mut self, id: RallyId, link: VoiceLink) -> RallyResult<()> {
        self.get_mut(id)?.voice = Some(link);
        Ok(())
    }

    pub fn attach_thread(&mut self, id: RallyId, thread_id: u64) -> RallyResult<()> {
        self.get_mut(id)?.thread_id = Some(thread_id);
        Ok(())
    }

    /// Unlink a voice channel from whichever rally uses it.
    pub fn detach_voice(&mut self, channel_id: u64) -> Option<RallyId> {
        let rally = self
            .rallies
            .values_mut()
            .find(|r| r.voice.as_ref().is_some_and(|v| v.channel_id == channel_id))?;

        rally.voice = None;
        Some(rally.id)
    }

    pub fn rally_for_channel(&self, channel_id: u64) -> Option<&Rally> {
        self.rallies
            .values()
            .find(|r| r.voice.as_ref().is_some_and(|v| v.channel_id == channel_id))
    }

    /// Discard a finished rally.
    pub fn remove(&mut self, id: RallyId) -> RallyResult<Rally> {
        self.rallies.remove(&id).ok_or(RallyError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.rallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rallies.is_empty()
    }

    fn get_mut(&mut self, id: RallyId) -> RallyResult<&mut Rally> {
        self.rallies.get_mut(&id).ok_or(RallyError::NotFound(id))
    }
}
