use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::models::{Event, HistoryEntry, Location, MatchRecord, Notification, Skill, Volunteer};
use crate::store::{
    venue_from, EventInput, EventStore, EventWrite, MatchStore, NotificationStore,
    SkillAssociation, StoreError,
};

#[derive(Debug, Clone)]
struct EventRecord {
    id: i64,
    name: String,
    description: String,
    date: NaiveDate,
    volunteers_needed: i64,
    urgency: String,
    location_id: i64,
}

#[derive(Debug, Default, Clone)]
struct MemoryState {
    next_id: i64,
    locations: Vec<Location>,
    skills: Vec<Skill>,
    volunteers: Vec<Volunteer>,
    events: Vec<EventRecord>,
    event_skills: Vec<(i64, i64)>,
    history: Vec<MatchRecord>,
    notifications: Vec<Notification>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn resolve_location(&self, location_text: &str) -> Option<i64> {
        let venue = venue_from(location_text);
        if venue.is_empty() {
            return None;
        }
        if let Some(location) = self.locations.iter().find(|l| l.venue_name == venue) {
            return Some(location.id);
        }
        self.locations
            .iter()
            .find(|l| l.venue_name.contains(venue))
            .map(|l| l.id)
    }

    fn apply_skills(
        &mut self,
        event_id: i64,
        names: &[String],
        clear_existing: bool,
    ) -> SkillAssociation {
        if clear_existing {
            self.event_skills.retain(|(e, _)| *e != event_id);
        }
        let mut outcome = SkillAssociation::default();
        for name in names {
            match self.skills.iter().find(|s| &s.name == name) {
                Some(skill) => {
                    self.event_skills.push((event_id, skill.id));
                    outcome.applied.push(name.clone());
                }
                None => outcome.skipped.push(name.clone()),
            }
        }
        outcome
    }

    fn project(&self, record: &EventRecord) -> Option<Event> {
        let location = self.locations.iter().find(|l| l.id == record.location_id)?;
        let registered = self
            .history
            .iter()
            .filter(|h| h.event_id == record.id)
            .count() as i64;
        let confirmed = self
            .history
            .iter()
            .filter(|h| h.event_id == record.id && h.checked_in)
            .count() as i64;
        let mut skills: Vec<String> = self
            .event_skills
            .iter()
            .filter(|(event_id, _)| *event_id == record.id)
            .filter_map(|(_, skill_id)| {
                self.skills
                    .iter()
                    .find(|s| s.id == *skill_id)
                    .map(|s| s.name.clone())
            })
            .collect();
        skills.sort();

        Some(Event {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            date: record.date,
            volunteers_needed: record.volunteers_needed,
            urgency: record.urgency.clone(),
            location_id: location.id,
            venue_name: location.venue_name.clone(),
            address: location.address.clone(),
            volunteers_registered: registered,
            volunteers_confirmed: confirmed,
            skills,
        })
    }
}

/// In-memory store used by the test suite. Implements the same traits as the
/// MySQL store behind the same `Arc<dyn Store>` seam; writes stage their
/// changes on a copy of the state and swap it in only on success, mirroring
/// the commit/rollback boundary of the real store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_skill_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }

    fn seed(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("store mutex poisoned")
    }

    /// Makes the next event write fail after its primary row is staged,
    /// exercising the rollback path.
    pub fn fail_next_skill_write(&self) {
        self.fail_skill_writes.store(true, Ordering::SeqCst);
    }

    pub fn add_location(&self, venue_name: &str, address: &str) -> i64 {
        let mut state = self.seed();
        let id = state.next_id();
        state.locations.push(Location {
            id,
            venue_name: venue_name.to_string(),
            address: address.to_string(),
        });
        id
    }

    pub fn add_skill(&self, name: &str, description: Option<&str>) -> i64 {
        let mut state = self.seed();
        let id = state.next_id();
        state.skills.push(Skill {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
        });
        id
    }

    pub fn add_volunteer(
        &self,
        username: &str,
        email: &str,
        phone: Option<&str>,
        full_name: &str,
    ) -> i64 {
        let mut state = self.seed();
        let id = state.next_id();
        state.volunteers.push(Volunteer {
            id,
            username: username.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            full_name: full_name.to_string(),
        });
        id
    }

    pub fn add_history(&self, event_id: i64, volunteer_id: i64, checked_in: bool) -> i64 {
        let mut state = self.seed();
        let id = state.next_id();
        state.history.push(MatchRecord {
            id,
            event_id,
            volunteer_id,
            checked_in,
        });
        id
    }

    pub fn add_notification(&self, volunteer_id: i64, event_id: Option<i64>, message: &str) -> i64 {
        let mut state = self.seed();
        let id = state.next_id();
        state.notifications.push(Notification {
            id,
            volunteer_id,
            event_id,
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now().naive_utc(),
        });
        id
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list_events(&self, future_only: bool) -> Result<Vec<Event>, StoreError> {
        let state = self.lock()?;
        let today = Local::now().date_naive();
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|record| !future_only || record.date >= today)
            .filter_map(|record| state.project(record))
            .collect();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .events
            .iter()
            .find(|record| record.id == id)
            .and_then(|record| state.project(record)))
    }

    async fn create_event(&self, input: EventInput) -> Result<EventWrite, StoreError> {
        let mut state = self.lock()?;
        let location_id = state
            .resolve_location(&input.location)
            .ok_or(StoreError::LocationNotResolved)?;

        let mut scratch = state.clone();
        let event_id = scratch.next_id();
        scratch.events.push(EventRecord {
            id: event_id,
            name: input.name.clone(),
            description: input.description.clone(),
            date: input.date,
            volunteers_needed: input.volunteers_needed,
            urgency: input.urgency.clone(),
            location_id,
        });

        if self.fail_skill_writes.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected skill write failure".to_string()));
        }

        let skills = match &input.skills {
            Some(names) => scratch.apply_skills(event_id, names, false),
            None => SkillAssociation::default(),
        };

        let event = scratch
            .events
            .iter()
            .find(|record| record.id == event_id)
            .and_then(|record| scratch.project(record))
            .ok_or(StoreError::EventNotFound)?;

        *state = scratch;
        Ok(EventWrite { event, skills })
    }

    async fn update_event(&self, id: i64, input: EventInput) -> Result<EventWrite, StoreError> {
        let mut state = self.lock()?;
        if !state.events.iter().any(|record| record.id == id) {
            return Err(StoreError::EventNotFound);
        }
        let location_id = state
            .resolve_location(&input.location)
            .ok_or(StoreError::LocationNotResolved)?;

        let mut scratch = state.clone();
        if let Some(record) = scratch.events.iter_mut().find(|record| record.id == id) {
            record.name = input.name.clone();
            record.description = input.description.clone();
            record.date = input.date;
            record.volunteers_needed = input.volunteers_needed;
            record.urgency = input.urgency.clone();
            record.location_id = location_id;
        }

        if self.fail_skill_writes.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected skill write failure".to_string()));
        }

        let skills = match &input.skills {
            Some(names) => scratch.apply_skills(id, names, true),
            None => SkillAssociation::default(),
        };

        let event = scratch
            .events
            .iter()
            .find(|record| record.id == id)
            .and_then(|record| scratch.project(record))
            .ok_or(StoreError::EventNotFound)?;

        *state = scratch;
        Ok(EventWrite { event, skills })
    }

    async fn delete_event(&self, id: i64) -> Result<Event, StoreError> {
        let mut state = self.lock()?;
        let snapshot = state
            .events
            .iter()
            .find(|record| record.id == id)
            .and_then(|record| state.project(record))
            .ok_or(StoreError::EventNotFound)?;

        let mut scratch = state.clone();
        scratch.event_skills.retain(|(event_id, _)| *event_id != id);
        scratch.notifications.retain(|n| n.event_id != Some(id));
        scratch.history.retain(|h| h.event_id != id);
        scratch.events.retain(|record| record.id != id);

        *state = scratch;
        Ok(snapshot)
    }

    async fn search_by_skills(&self, names: &[String]) -> Result<Vec<Event>, StoreError> {
        let state = self.lock()?;
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter_map(|record| state.project(record))
            .filter(|event| event.skills.iter().any(|skill| names.contains(skill)))
            .collect();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let state = self.lock()?;
        let mut locations = state.locations.clone();
        locations.sort_by(|a, b| a.venue_name.cmp(&b.venue_name));
        Ok(locations)
    }

    async fn list_skills(&self) -> Result<Vec<Skill>, StoreError> {
        let state = self.lock()?;
        let mut skills = state.skills.clone();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn search_volunteers(&self, query: &str) -> Result<Vec<Volunteer>, StoreError> {
        let state = self.lock()?;
        let mut volunteers: Vec<Volunteer> = state
            .volunteers
            .iter()
            .filter(|v| {
                v.username.contains(query)
                    || v.email.contains(query)
                    || v.phone.as_deref().is_some_and(|p| p.contains(query))
                    || v.full_name.contains(query)
            })
            .cloned()
            .collect();
        volunteers.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(volunteers)
    }

    async fn volunteer_history(&self, volunteer_id: i64) -> Result<Vec<HistoryEntry>, StoreError> {
        let state = self.lock()?;
        if !state.volunteers.iter().any(|v| v.id == volunteer_id) {
            return Err(StoreError::VolunteerNotFound);
        }
        let mut entries: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter(|h| h.volunteer_id == volunteer_id)
            .filter_map(|h| {
                state
                    .events
                    .iter()
                    .find(|record| record.id == h.event_id)
                    .map(|record| HistoryEntry {
                        id: h.id,
                        event_id: h.event_id,
                        event_name: record.name.clone(),
                        date: record.date,
                        checked_in: h.checked_in,
                    })
            })
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    async fn list_match_events(&self) -> Result<Vec<Event>, StoreError> {
        self.list_events(false).await
    }

    async fn create_match(
        &self,
        volunteer_id: i64,
        event_id: i64,
    ) -> Result<MatchRecord, StoreError> {
        let mut state = self.lock()?;
        if !state.volunteers.iter().any(|v| v.id == volunteer_id) {
            return Err(StoreError::VolunteerNotFound);
        }
        let needed = state
            .events
            .iter()
            .find(|record| record.id == event_id)
            .map(|record| record.volunteers_needed)
            .ok_or(StoreError::EventNotFound)?;
        if state
            .history
            .iter()
            .any(|h| h.event_id == event_id && h.volunteer_id == volunteer_id)
        {
            return Err(StoreError::DuplicateMatch);
        }
        let registered = state.history.iter().filter(|h| h.event_id == event_id).count() as i64;
        if registered >= needed {
            return Err(StoreError::EventFull);
        }

        let id = state.next_id();
        let record = MatchRecord {
            id,
            event_id,
            volunteer_id,
            checked_in: false,
        };
        state.history.push(record.clone());
        Ok(record)
    }

    async fn delete_match(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let before = state.history.len();
        state.history.retain(|h| h.id != id);
        if state.history.len() == before {
            return Err(StoreError::MatchNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn notify_volunteer(
        &self,
        volunteer_id: i64,
        event_id: Option<i64>,
        message: &str,
    ) -> Result<Notification, StoreError> {
        let mut state = self.lock()?;
        if !state.volunteers.iter().any(|v| v.id == volunteer_id) {
            return Err(StoreError::VolunteerNotFound);
        }
        let id = state.next_id();
        let notification = Notification {
            id,
            volunteer_id,
            event_id,
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now().naive_utc(),
        };
        state.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn broadcast(&self, event_id: Option<i64>, message: &str) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let recipients: Vec<i64> = state.volunteers.iter().map(|v| v.id).collect();
        for volunteer_id in &recipients {
            let id = state.next_id();
            state.notifications.push(Notification {
                id,
                volunteer_id: *volunteer_id,
                event_id,
                message: message.to_string(),
                is_read: false,
                created_at: Utc::now().naive_utc(),
            });
        }
        Ok(recipients.len() as u64)
    }

    async fn volunteer_notifications(
        &self,
        volunteer_id: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.lock()?;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.volunteer_id == volunteer_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notifications)
    }

    async fn mark_read(&self, id: i64) -> Result<Notification, StoreError> {
        let mut state = self.lock()?;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(StoreError::NotificationNotFound)?;
        notification.is_read = true;
        Ok(notification.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(location: &str, skills: Option<Vec<&str>>) -> EventInput {
        EventInput {
            name: "Community Food Drive".to_string(),
            description: "Help".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
            volunteers_needed: 20,
            urgency: "Medium".to_string(),
            location: location.to_string(),
            skills: skills.map(|names| names.into_iter().map(str::to_string).collect()),
        }
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_location("Community Center", "123 Main St");
        store.add_location("Riverside Park", "9 River Rd");
        store.add_skill("organizing", None);
        store.add_skill("cooking", None);
        store
    }

    #[tokio::test]
    async fn test_exact_venue_match_wins_over_partial() {
        let store = seeded_store();
        store.add_location("Center", "1 Short St");

        // "Center" matches "Community Center" partially but "Center" exactly
        let write = store
            .create_event(input("Center, somewhere", None))
            .await
            .unwrap();
        assert_eq!(write.event.venue_name, "Center");
    }

    #[tokio::test]
    async fn test_partial_venue_match_used_when_no_exact() {
        let store = seeded_store();
        let write = store.create_event(input("Riverside", None)).await.unwrap();
        assert_eq!(write.event.venue_name, "Riverside Park");
    }

    #[tokio::test]
    async fn test_unknown_skill_names_are_skipped_not_errors() {
        let store = seeded_store();
        let write = store
            .create_event(input(
                "Community Center",
                Some(vec!["organizing", "NonexistentSkill"]),
            ))
            .await
            .unwrap();
        assert_eq!(write.event.skills, vec!["organizing"]);
        assert_eq!(write.skills.applied, vec!["organizing"]);
        assert_eq!(write.skills.skipped, vec!["NonexistentSkill"]);
    }

    #[tokio::test]
    async fn test_injected_failure_rolls_back_event_row() {
        let store = seeded_store();
        store.fail_next_skill_write();
        let result = store
            .create_event(input("Community Center", Some(vec!["organizing"])))
            .await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert!(store.list_events(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_with_empty_skill_list_clears_skills() {
        let store = seeded_store();
        let created = store
            .create_event(input("Community Center", Some(vec!["organizing"])))
            .await
            .unwrap();
        let updated = store
            .update_event(created.event.id, input("Community Center", Some(vec![])))
            .await
            .unwrap();
        assert!(updated.event.skills.is_empty());
    }

    #[tokio::test]
    async fn test_update_without_skill_list_retains_skills() {
        let store = seeded_store();
        let created = store
            .create_event(input("Community Center", Some(vec!["organizing"])))
            .await
            .unwrap();
        let updated = store
            .update_event(created.event.id, input("Community Center", None))
            .await
            .unwrap();
        assert_eq!(updated.event.skills, vec!["organizing"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_skills_notifications_history() {
        let store = seeded_store();
        let volunteer_id = store.add_volunteer("jdoe", "j@example.com", None, "Jane Doe");
        let created = store
            .create_event(input("Community Center", Some(vec!["organizing", "cooking"])))
            .await
            .unwrap();
        let event_id = created.event.id;
        store.add_history(event_id, volunteer_id, false);
        store.add_notification(volunteer_id, Some(event_id), "Upcoming event");

        store.delete_event(event_id).await.unwrap();

        assert!(store.get_event(event_id).await.unwrap().is_none());
        assert!(store
            .volunteer_history(volunteer_id)
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .volunteer_notifications(volunteer_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_match_capacity_and_duplicate_checks() {
        let store = seeded_store();
        let v1 = store.add_volunteer("a", "a@example.com", None, "A");
        let v2 = store.add_volunteer("b", "b@example.com", None, "B");
        let mut event_input = input("Community Center", None);
        event_input.volunteers_needed = 1;
        let event_id = store.create_event(event_input).await.unwrap().event.id;

        store.create_match(v1, event_id).await.unwrap();
        assert!(matches!(
            store.create_match(v1, event_id).await,
            Err(StoreError::DuplicateMatch)
        ));
        assert!(matches!(
            store.create_match(v2, event_id).await,
            Err(StoreError::EventFull)
        ));
    }
}
