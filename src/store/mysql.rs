use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::MySql;
use sqlx::{FromRow, MySqlPool, Transaction};

use crate::models::{Event, HistoryEntry, Location, MatchRecord, Notification, Skill, Volunteer};
use crate::store::{
    venue_from, EventInput, EventStore, EventWrite, MatchStore, NotificationStore,
    SkillAssociation, StoreError,
};

/// Joins the GROUP_CONCAT skill list on the ASCII unit separator; a comma
/// would corrupt skill names that themselves contain one.
const SKILL_SEPARATOR: char = '\u{1f}';

/// Event projection shared by every event read: the event row joined with its
/// location, correlated volunteer counts, and a GROUP_CONCAT of skill names.
const EVENT_SELECT: &str = "
SELECT e.id,
       e.name,
       e.description,
       e.date,
       e.volunteers_needed,
       e.urgency,
       e.location_id,
       l.venue_name,
       l.address,
       (SELECT COUNT(*) FROM volunteering_history vh
         WHERE vh.event_id = e.id) AS volunteers_registered,
       (SELECT COUNT(*) FROM volunteering_history vh
         WHERE vh.event_id = e.id AND vh.checked_in = 1) AS volunteers_confirmed,
       (SELECT GROUP_CONCAT(s.name ORDER BY s.name SEPARATOR '\u{1f}')
          FROM event_skills es
          JOIN skills s ON s.id = es.skill_id
         WHERE es.event_id = e.id) AS skills
  FROM events e
  JOIN locations l ON l.id = e.location_id
";

#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    name: String,
    description: String,
    date: NaiveDate,
    volunteers_needed: i64,
    urgency: String,
    location_id: i64,
    venue_name: String,
    address: String,
    volunteers_registered: i64,
    volunteers_confirmed: i64,
    skills: Option<String>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            description: row.description,
            date: row.date,
            volunteers_needed: row.volunteers_needed,
            urgency: row.urgency,
            location_id: row.location_id,
            venue_name: row.venue_name,
            address: row.address,
            volunteers_registered: row.volunteers_registered,
            volunteers_confirmed: row.volunteers_confirmed,
            skills: row
                .skills
                .map(|joined| joined.split(SKILL_SEPARATOR).map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

/// Production store backed by a pooled MySQL connection. Writes run inside a
/// transaction; an uncommitted `Transaction` rolls back when dropped, so every
/// early return via `?` releases the connection with no partial work left
/// behind.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Maps free-text "venue, address" form input to a location id: exact
    /// venue match first, then first partial match.
    async fn resolve_location(&self, location_text: &str) -> Result<Option<i64>, StoreError> {
        let venue = venue_from(location_text);
        if venue.is_empty() {
            return Ok(None);
        }

        let exact: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM locations WHERE venue_name = ?")
                .bind(venue)
                .fetch_optional(&self.pool)
                .await?;
        if let Some((id,)) = exact {
            return Ok(Some(id));
        }

        let partial: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM locations WHERE venue_name LIKE ? ORDER BY id LIMIT 1")
                .bind(format!("%{venue}%"))
                .fetch_optional(&self.pool)
                .await?;
        Ok(partial.map(|(id,)| id))
    }
}

async fn fetch_event<'a, E>(executor: E, id: i64) -> Result<Option<Event>, StoreError>
where
    E: sqlx::Executor<'a, Database = MySql>,
{
    let sql = format!("{EVENT_SELECT} WHERE e.id = ?");
    let row = sqlx::query_as::<_, EventRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Event::from))
}

/// Replaces the event's skill associations inside the caller's transaction.
/// Names missing from the skill catalog are skipped, never an error.
async fn replace_event_skills(
    tx: &mut Transaction<'_, MySql>,
    event_id: i64,
    names: &[String],
    clear_existing: bool,
) -> Result<SkillAssociation, StoreError> {
    if clear_existing {
        sqlx::query("DELETE FROM event_skills WHERE event_id = ?")
            .bind(event_id)
            .execute(&mut **tx)
            .await?;
    }

    let mut outcome = SkillAssociation::default();
    for name in names {
        let skill: Option<(i64,)> = sqlx::query_as("SELECT id FROM skills WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
        match skill {
            Some((skill_id,)) => {
                sqlx::query("INSERT INTO event_skills (event_id, skill_id) VALUES (?, ?)")
                    .bind(event_id)
                    .bind(skill_id)
                    .execute(&mut **tx)
                    .await?;
                outcome.applied.push(name.clone());
            }
            None => outcome.skipped.push(name.clone()),
        }
    }
    Ok(outcome)
}

#[async_trait]
impl EventStore for MySqlStore {
    async fn list_events(&self, future_only: bool) -> Result<Vec<Event>, StoreError> {
        let sql = if future_only {
            format!("{EVENT_SELECT} WHERE e.date >= CURDATE() ORDER BY e.date ASC")
        } else {
            format!("{EVENT_SELECT} ORDER BY e.date ASC")
        };
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>, StoreError> {
        fetch_event(&self.pool, id).await
    }

    async fn create_event(&self, input: EventInput) -> Result<EventWrite, StoreError> {
        let location_id = self
            .resolve_location(&input.location)
            .await?
            .ok_or(StoreError::LocationNotResolved)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO events (name, description, date, volunteers_needed, urgency, location_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.date)
        .bind(input.volunteers_needed)
        .bind(&input.urgency)
        .bind(location_id)
        .execute(&mut *tx)
        .await?;
        let event_id = result.last_insert_id() as i64;

        let skills = match &input.skills {
            Some(names) => replace_event_skills(&mut tx, event_id, names, false).await?,
            None => SkillAssociation::default(),
        };

        // Read-your-write happens before commit so a projection failure can
        // never report 500 for an already-committed event.
        let event = fetch_event(&mut *tx, event_id)
            .await?
            .ok_or(StoreError::EventNotFound)?;

        tx.commit().await?;
        Ok(EventWrite { event, skills })
    }

    async fn update_event(&self, id: i64, input: EventInput) -> Result<EventWrite, StoreError> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::EventNotFound);
        }

        let location_id = self
            .resolve_location(&input.location)
            .await?
            .ok_or(StoreError::LocationNotResolved)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE events \
                SET name = ?, description = ?, date = ?, volunteers_needed = ?, \
                    urgency = ?, location_id = ? \
              WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.date)
        .bind(input.volunteers_needed)
        .bind(&input.urgency)
        .bind(location_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // An omitted skill list retains the stored skills; an empty list
        // clears them (delete-all-then-reinsert).
        let skills = match &input.skills {
            Some(names) => replace_event_skills(&mut tx, id, names, true).await?,
            None => SkillAssociation::default(),
        };

        let event = fetch_event(&mut *tx, id)
            .await?
            .ok_or(StoreError::EventNotFound)?;

        tx.commit().await?;
        Ok(EventWrite { event, skills })
    }

    async fn delete_event(&self, id: i64) -> Result<Event, StoreError> {
        let snapshot = fetch_event(&self.pool, id)
            .await?
            .ok_or(StoreError::EventNotFound)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM event_skills WHERE event_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM notifications WHERE event_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM volunteering_history WHERE event_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(snapshot)
    }

    async fn search_by_skills(&self, names: &[String]) -> Result<Vec<Event>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "{EVENT_SELECT} \
             WHERE e.id IN (SELECT es.event_id \
                              FROM event_skills es \
                              JOIN skills s ON s.id = es.skill_id \
                             WHERE s.name IN ({placeholders})) \
             ORDER BY e.date ASC"
        );

        let mut query = sqlx::query_as::<_, EventRow>(&sql);
        for name in names {
            query = query.bind(name);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, venue_name, address FROM locations ORDER BY venue_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }

    async fn list_skills(&self) -> Result<Vec<Skill>, StoreError> {
        let skills =
            sqlx::query_as::<_, Skill>("SELECT id, name, description FROM skills ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(skills)
    }
}

#[async_trait]
impl MatchStore for MySqlStore {
    async fn search_volunteers(&self, query: &str) -> Result<Vec<Volunteer>, StoreError> {
        let pattern = format!("%{query}%");
        let volunteers = sqlx::query_as::<_, Volunteer>(
            "SELECT id, username, email, phone, full_name \
               FROM volunteers \
              WHERE username LIKE ? OR email LIKE ? OR phone LIKE ? OR full_name LIKE ? \
              ORDER BY username",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(volunteers)
    }

    async fn volunteer_history(&self, volunteer_id: i64) -> Result<Vec<HistoryEntry>, StoreError> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM volunteers WHERE id = ?")
            .bind(volunteer_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::VolunteerNotFound);
        }

        let entries = sqlx::query_as::<_, HistoryEntry>(
            "SELECT vh.id, vh.event_id, e.name AS event_name, e.date, vh.checked_in \
               FROM volunteering_history vh \
               JOIN events e ON e.id = vh.event_id \
              WHERE vh.volunteer_id = ? \
              ORDER BY e.date DESC",
        )
        .bind(volunteer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn list_match_events(&self) -> Result<Vec<Event>, StoreError> {
        self.list_events(false).await
    }

    // Deliberately not the transactional envelope event writes use: the
    // checks and the insert run as separate pool queries, matching the
    // weaker consistency this path has always had.
    async fn create_match(
        &self,
        volunteer_id: i64,
        event_id: i64,
    ) -> Result<MatchRecord, StoreError> {
        let volunteer: Option<(i64,)> = sqlx::query_as("SELECT id FROM volunteers WHERE id = ?")
            .bind(volunteer_id)
            .fetch_optional(&self.pool)
            .await?;
        if volunteer.is_none() {
            return Err(StoreError::VolunteerNotFound);
        }

        let event: Option<(i64, i64)> = sqlx::query_as(
            "SELECT e.volunteers_needed, \
                    (SELECT COUNT(*) FROM volunteering_history vh WHERE vh.event_id = e.id) \
               FROM events e WHERE e.id = ?",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        let (needed, registered) = event.ok_or(StoreError::EventNotFound)?;

        let duplicate: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM volunteering_history WHERE event_id = ? AND volunteer_id = ?",
        )
        .bind(event_id)
        .bind(volunteer_id)
        .fetch_optional(&self.pool)
        .await?;
        if duplicate.is_some() {
            return Err(StoreError::DuplicateMatch);
        }

        if registered >= needed {
            return Err(StoreError::EventFull);
        }

        let result = sqlx::query(
            "INSERT INTO volunteering_history (event_id, volunteer_id, checked_in) \
             VALUES (?, ?, 0)",
        )
        .bind(event_id)
        .bind(volunteer_id)
        .execute(&self.pool)
        .await?;

        Ok(MatchRecord {
            id: result.last_insert_id() as i64,
            event_id,
            volunteer_id,
            checked_in: false,
        })
    }

    async fn delete_match(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM volunteering_history WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::MatchNotFound);
        }
        Ok(())
    }
}

const NOTIFICATION_SELECT: &str =
    "SELECT id, volunteer_id, event_id, message, is_read, created_at FROM notifications";

#[async_trait]
impl NotificationStore for MySqlStore {
    async fn notify_volunteer(
        &self,
        volunteer_id: i64,
        event_id: Option<i64>,
        message: &str,
    ) -> Result<Notification, StoreError> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM volunteers WHERE id = ?")
            .bind(volunteer_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::VolunteerNotFound);
        }

        let result =
            sqlx::query("INSERT INTO notifications (volunteer_id, event_id, message) VALUES (?, ?, ?)")
                .bind(volunteer_id)
                .bind(event_id)
                .bind(message)
                .execute(&self.pool)
                .await?;

        let sql = format!("{NOTIFICATION_SELECT} WHERE id = ?");
        let notification = sqlx::query_as::<_, Notification>(&sql)
            .bind(result.last_insert_id() as i64)
            .fetch_one(&self.pool)
            .await?;
        Ok(notification)
    }

    async fn broadcast(&self, event_id: Option<i64>, message: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO notifications (volunteer_id, event_id, message) \
             SELECT id, ?, ? FROM volunteers",
        )
        .bind(event_id)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn volunteer_notifications(
        &self,
        volunteer_id: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let sql = format!(
            "{NOTIFICATION_SELECT} WHERE volunteer_id = ? ORDER BY created_at DESC, id DESC"
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(volunteer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(notifications)
    }

    async fn mark_read(&self, id: i64) -> Result<Notification, StoreError> {
        // MySQL reports zero affected rows for a no-op update, so existence
        // is checked with a read rather than rows_affected.
        let sql = format!("{NOTIFICATION_SELECT} WHERE id = ?");
        let mut notification = sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotificationNotFound)?;

        sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        notification.is_read = true;
        Ok(notification)
    }
}
