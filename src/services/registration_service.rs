//! Capacity-guarded registration for leisure activities.
//!
//! Admission is a read-check-write sequence: read the counter, refuse when
//! full, insert the registration row, then increment the counter with a
//! conditional update keyed on the previously observed value. A caller that
//! loses the race re-reads and retries the increment for as long as capacity
//! remains; once the activity is full it deletes its registration row again
//! and reports the activity as full. The counter therefore never exceeds
//! `max_participants`, without any in-process locking (multiple server
//! instances may run side by side).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::database::{activities_repo, pre_registrations_repo, registrations_repo};
use crate::services::notification_service::AdminNotifier;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AttendeeForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid attendee details: {0}")]
    Validation(&'static str),
    #[error("activity not found")]
    NotFound,
    #[error("registration window has closed")]
    RegistrationClosed,
    #[error("activity is at full capacity")]
    CapacityExceeded,
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct AdmittedRegistration {
    pub registration_id: String,
}

/// Single registration attempt. `CapacityExceeded` is final for the observed
/// state: it is only returned once the activity is actually full.
pub async fn register_attendee<N: AdminNotifier>(
    pool: &SqlitePool,
    notifier: &N,
    activity_id: &str,
    form: &AttendeeForm,
) -> Result<AdmittedRegistration, RegistrationError> {
    validate_form(form)?;

    let Some(activity) = activities_repo::load_activity_capacity(pool, activity_id).await? else {
        return Err(RegistrationError::NotFound);
    };

    // Past the window the caller should offer pre-registration instead.
    if registration_window_closed(activity.end_date.as_deref(), Utc::now()) {
        return Err(RegistrationError::RegistrationClosed);
    }

    if activity.current_participants >= activity.max_participants {
        return Err(RegistrationError::CapacityExceeded);
    }

    let registration_id = Uuid::new_v4().to_string();
    let email = form.email.trim().to_string();
    registrations_repo::insert_registration(
        pool,
        registrations_repo::NewRegistration {
            id: &registration_id,
            activity_id,
            first_name: form.first_name.trim(),
            last_name: form.last_name.trim(),
            email: &email,
            phone: form.phone.trim(),
        },
    )
    .await?;

    // The insert and the increment are two separate writes, so any exit
    // without a successful increment must delete the row again or the
    // registration list and the counter drift apart.
    //
    // A failed conditional update means another registration moved the
    // counter between our read and our write. The counter only ever moves
    // towards max_participants, so re-reading and retrying terminates: every
    // round either wins the update or observes a larger count.
    let mut observed = activity.current_participants;
    loop {
        if observed >= activity.max_participants {
            rollback_registration(pool, activity_id, &email).await;
            return Err(RegistrationError::CapacityExceeded);
        }

        match activities_repo::conditional_increment_participants(pool, activity_id, observed).await
        {
            Ok(1) => break,
            Ok(_) => {
                match activities_repo::load_activity_capacity(pool, activity_id).await {
                    Ok(Some(a)) => observed = a.current_participants,
                    Ok(None) => {
                        // Activity deleted mid-flight.
                        rollback_registration(pool, activity_id, &email).await;
                        return Err(RegistrationError::NotFound);
                    }
                    Err(e) => {
                        rollback_registration(pool, activity_id, &email).await;
                        return Err(RegistrationError::Store(e));
                    }
                }
            }
            Err(e) => {
                rollback_registration(pool, activity_id, &email).await;
                return Err(RegistrationError::Store(e));
            }
        }
    }

    // Admission is already final here; a failed email never unwinds it.
    if notifier
        .notify_registration(&activity.title, form)
        .await
        .is_err()
    {
        warn!(
            "Admin notification failed for activity {}, registration kept",
            activity_id
        );
    }

    Ok(AdmittedRegistration { registration_id })
}

async fn rollback_registration(pool: &SqlitePool, activity_id: &str, email: &str) {
    if let Err(e) = registrations_repo::delete_registration(pool, activity_id, email).await {
        warn!(
            "Rollback delete failed for activity {} ({}): {}",
            activity_id, email, e
        );
    }
}

/// Records interest for the next session. No capacity check and no counter
/// write; this is the path the caller switches to once `register_attendee`
/// returns `RegistrationClosed`.
pub async fn pre_register_attendee(
    pool: &SqlitePool,
    activity_id: &str,
    form: &AttendeeForm,
) -> Result<String, RegistrationError> {
    validate_form(form)?;

    if activities_repo::load_activity_capacity(pool, activity_id)
        .await?
        .is_none()
    {
        return Err(RegistrationError::NotFound);
    }

    let pre_registration_id = Uuid::new_v4().to_string();
    pre_registrations_repo::insert_pre_registration(
        pool,
        pre_registrations_repo::NewPreRegistration {
            id: &pre_registration_id,
            activity_id,
            first_name: form.first_name.trim(),
            last_name: form.last_name.trim(),
            email: form.email.trim(),
            phone: form.phone.trim(),
            status: "pending",
        },
    )
    .await?;

    Ok(pre_registration_id)
}

/// No end date means the window never closes. A stored end date that does not
/// parse is logged and treated as open rather than locking everyone out.
pub fn registration_window_closed(end_date: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(raw) = end_date else {
        return false;
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(end) => now > end.with_timezone(&Utc),
        Err(e) => {
            warn!("Unparseable activity end_date '{}': {}", raw, e);
            false
        }
    }
}

fn validate_form(form: &AttendeeForm) -> Result<(), RegistrationError> {
    if form.first_name.trim().is_empty() {
        return Err(RegistrationError::Validation("first_name is required"));
    }
    if form.last_name.trim().is_empty() {
        return Err(RegistrationError::Validation("last_name is required"));
    }
    if form.phone.trim().is_empty() {
        return Err(RegistrationError::Validation("phone is required"));
    }
    let email = form.email.trim();
    if email.is_empty() {
        return Err(RegistrationError::Validation("email is required"));
    }
    if !is_plausible_email(email) {
        return Err(RegistrationError::Validation("email is not valid"));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.len() >= 3
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::database::activities_repo::NewActivity;

    #[derive(Default)]
    struct RecordingNotifier {
        titles: Mutex<Vec<String>>,
    }

    impl AdminNotifier for RecordingNotifier {
        async fn notify_registration(
            &self,
            activity_title: &str,
            _attendee: &AttendeeForm,
        ) -> Result<(), ()> {
            self.titles.lock().unwrap().push(activity_title.to_string());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl AdminNotifier for FailingNotifier {
        async fn notify_registration(
            &self,
            _activity_title: &str,
            _attendee: &AttendeeForm,
        ) -> Result<(), ()> {
            Err(())
        }
    }

    fn attendee(email: &str) -> AttendeeForm {
        AttendeeForm {
            first_name: "Marie".to_string(),
            last_name: "Dupont".to_string(),
            email: email.to_string(),
            phone: "0690 12 34 56".to_string(),
        }
    }

    async fn seed_activity(
        pool: &SqlitePool,
        max_participants: i64,
        current_participants: i64,
        end_date: Option<&str>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        activities_repo::insert_activity(
            pool,
            NewActivity {
                id: &id,
                title: "Balade en mer",
                description: None,
                location: Some("Pointe-à-Pitre"),
                start_date: "2031-07-14T09:00:00Z",
                end_date,
                max_participants,
                image_url: None,
            },
        )
        .await
        .unwrap();

        if current_participants > 0 {
            sqlx::query("UPDATE activities SET current_participants = ? WHERE id = ?")
                .bind(current_participants)
                .bind(&id)
                .execute(pool)
                .await
                .unwrap();
        }

        id
    }

    async fn participant_count(pool: &SqlitePool, activity_id: &str) -> i64 {
        sqlx::query_scalar("SELECT current_participants FROM activities WHERE id = ?")
            .bind(activity_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn registration_rows(pool: &SqlitePool, activity_id: &str) -> i64 {
        crate::database::registrations_repo::count_registrations_by_activity(pool, activity_id)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn admits_when_capacity_available(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 2, 0, None).await;
        let notifier = RecordingNotifier::default();

        let admitted = register_attendee(&pool, &notifier, &activity_id, &attendee("a@example.com"))
            .await
            .unwrap();

        assert!(!admitted.registration_id.is_empty());
        assert_eq!(participant_count(&pool, &activity_id).await, 1);
        assert_eq!(registration_rows(&pool, &activity_id).await, 1);
        assert_eq!(
            notifier.titles.lock().unwrap().as_slice(),
            ["Balade en mer"]
        );
    }

    #[sqlx::test]
    async fn rejects_when_already_full(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 2, 2, None).await;
        let notifier = RecordingNotifier::default();

        let result =
            register_attendee(&pool, &notifier, &activity_id, &attendee("a@example.com")).await;

        assert!(matches!(result, Err(RegistrationError::CapacityExceeded)));
        assert_eq!(participant_count(&pool, &activity_id).await, 2);
        assert_eq!(registration_rows(&pool, &activity_id).await, 0);
        assert!(notifier.titles.lock().unwrap().is_empty());
    }

    #[sqlx::test]
    async fn rejection_is_repeatable(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 1, 1, None).await;
        let notifier = RecordingNotifier::default();
        let form = attendee("a@example.com");

        for _ in 0..2 {
            let result = register_attendee(&pool, &notifier, &activity_id, &form).await;
            assert!(matches!(result, Err(RegistrationError::CapacityExceeded)));
        }
        assert_eq!(participant_count(&pool, &activity_id).await, 1);
    }

    #[sqlx::test]
    async fn two_concurrent_registrations_fill_two_slots(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 2, 0, None).await;
        let notifier = Arc::new(RecordingNotifier::default());

        let mut handles = Vec::new();
        for i in 0..2 {
            let pool = pool.clone();
            let notifier = notifier.clone();
            let activity_id = activity_id.clone();
            handles.push(tokio::spawn(async move {
                let form = attendee(&format!("attendee{}@example.com", i));
                register_attendee(&pool, &*notifier, &activity_id, &form).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 2);
        assert_eq!(participant_count(&pool, &activity_id).await, 2);
        assert_eq!(registration_rows(&pool, &activity_id).await, 2);
    }

    #[sqlx::test]
    async fn three_racers_for_two_slots_admit_exactly_two(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 2, 0, None).await;
        let notifier = Arc::new(RecordingNotifier::default());

        let mut handles = Vec::new();
        for i in 0..3 {
            let pool = pool.clone();
            let notifier = notifier.clone();
            let activity_id = activity_id.clone();
            handles.push(tokio::spawn(async move {
                let form = attendee(&format!("attendee{}@example.com", i));
                register_attendee(&pool, &*notifier, &activity_id, &form).await
            }));
        }

        let mut admitted = 0;
        let mut capacity_exceeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(RegistrationError::CapacityExceeded) => capacity_exceeded += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(admitted, 2);
        assert_eq!(capacity_exceeded, 1);
        assert_eq!(participant_count(&pool, &activity_id).await, 2);
        // The loser's row must be rolled back, so rows equal the counter.
        assert_eq!(registration_rows(&pool, &activity_id).await, 2);
    }

    #[sqlx::test]
    async fn last_slot_has_a_single_winner(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 3, 2, None).await;
        let notifier = Arc::new(RecordingNotifier::default());

        let mut handles = Vec::new();
        for i in 0..4 {
            let pool = pool.clone();
            let notifier = notifier.clone();
            let activity_id = activity_id.clone();
            handles.push(tokio::spawn(async move {
                let form = attendee(&format!("attendee{}@example.com", i));
                register_attendee(&pool, &*notifier, &activity_id, &form).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(participant_count(&pool, &activity_id).await, 3);
        assert_eq!(registration_rows(&pool, &activity_id).await, 1);
    }

    #[sqlx::test]
    async fn counter_matches_rows_after_heavy_contention(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 3, 0, None).await;
        let notifier = Arc::new(RecordingNotifier::default());

        let mut handles = Vec::new();
        for i in 0..6 {
            let pool = pool.clone();
            let notifier = notifier.clone();
            let activity_id = activity_id.clone();
            handles.push(tokio::spawn(async move {
                let form = attendee(&format!("attendee{}@example.com", i));
                register_attendee(&pool, &*notifier, &activity_id, &form).await
            }));
        }
        for handle in handles {
            let _ = handle.await.unwrap();
        }

        assert_eq!(participant_count(&pool, &activity_id).await, 3);
        assert_eq!(registration_rows(&pool, &activity_id).await, 3);
    }

    #[sqlx::test]
    async fn closed_window_rejects_regardless_of_capacity(pool: SqlitePool) {
        let yesterday = (Utc::now() - chrono::Duration::days(1)).to_rfc3339();
        let activity_id = seed_activity(&pool, 10, 0, Some(&yesterday)).await;
        let notifier = RecordingNotifier::default();

        let result =
            register_attendee(&pool, &notifier, &activity_id, &attendee("a@example.com")).await;

        assert!(matches!(result, Err(RegistrationError::RegistrationClosed)));
        assert_eq!(registration_rows(&pool, &activity_id).await, 0);
        assert_eq!(participant_count(&pool, &activity_id).await, 0);
    }

    #[sqlx::test]
    async fn future_end_date_still_admits(pool: SqlitePool) {
        let tomorrow = (Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        let activity_id = seed_activity(&pool, 2, 0, Some(&tomorrow)).await;
        let notifier = RecordingNotifier::default();

        let result =
            register_attendee(&pool, &notifier, &activity_id, &attendee("a@example.com")).await;

        assert!(result.is_ok());
    }

    #[sqlx::test]
    async fn missing_email_is_rejected_without_writes(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 2, 0, None).await;
        let notifier = RecordingNotifier::default();

        let result = register_attendee(&pool, &notifier, &activity_id, &attendee("")).await;

        assert!(matches!(result, Err(RegistrationError::Validation(_))));
        assert_eq!(registration_rows(&pool, &activity_id).await, 0);
        assert_eq!(participant_count(&pool, &activity_id).await, 0);
        assert!(notifier.titles.lock().unwrap().is_empty());
    }

    #[sqlx::test]
    async fn implausible_email_is_rejected(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 2, 0, None).await;
        let notifier = RecordingNotifier::default();

        let result =
            register_attendee(&pool, &notifier, &activity_id, &attendee("not-an-email")).await;

        assert!(matches!(result, Err(RegistrationError::Validation(_))));
    }

    #[sqlx::test]
    async fn unknown_activity_is_not_found(pool: SqlitePool) {
        let notifier = RecordingNotifier::default();

        let result =
            register_attendee(&pool, &notifier, "no-such-id", &attendee("a@example.com")).await;

        assert!(matches!(result, Err(RegistrationError::NotFound)));
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[sqlx::test]
    async fn notification_failure_does_not_unwind_admission(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 2, 0, None).await;

        let result =
            register_attendee(&pool, &FailingNotifier, &activity_id, &attendee("a@example.com"))
                .await;

        assert!(result.is_ok());
        assert_eq!(participant_count(&pool, &activity_id).await, 1);
        assert_eq!(registration_rows(&pool, &activity_id).await, 1);
    }

    #[sqlx::test]
    async fn pre_registration_records_interest_without_capacity_check(pool: SqlitePool) {
        // Deliberately full: pre-registration must still succeed.
        let activity_id = seed_activity(&pool, 1, 1, None).await;

        let id = pre_register_attendee(&pool, &activity_id, &attendee("a@example.com"))
            .await
            .unwrap();

        assert!(!id.is_empty());
        assert_eq!(participant_count(&pool, &activity_id).await, 1);
        let status: String =
            sqlx::query_scalar("SELECT status FROM pre_registrations WHERE id = ?")
                .bind(&id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, "pending");
    }

    #[sqlx::test]
    async fn pre_registration_unknown_activity_is_not_found(pool: SqlitePool) {
        let result = pre_register_attendee(&pool, "no-such-id", &attendee("a@example.com")).await;
        assert!(matches!(result, Err(RegistrationError::NotFound)));
    }

    #[sqlx::test]
    async fn pre_registration_validates_fields(pool: SqlitePool) {
        let activity_id = seed_activity(&pool, 2, 0, None).await;
        let mut form = attendee("a@example.com");
        form.phone = "  ".to_string();

        let result = pre_register_attendee(&pool, &activity_id, &form).await;

        assert!(matches!(result, Err(RegistrationError::Validation(_))));
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pre_registrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn window_closed_only_after_end_date() {
        let now = DateTime::parse_from_rfc3339("2026-08-30T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert!(!registration_window_closed(None, now));
        assert!(!registration_window_closed(
            Some("2026-08-30T12:00:00Z"),
            now
        ));
        assert!(registration_window_closed(
            Some("2026-08-29T12:00:00Z"),
            now
        ));
        assert!(!registration_window_closed(
            Some("2026-09-01T12:00:00Z"),
            now
        ));
        // Garbage end dates leave the window open instead of locking out.
        assert!(!registration_window_closed(Some("la semaine prochaine"), now));
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("marie@example.com"));
        assert!(!is_plausible_email("marie"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("marie@example"));
        assert!(!is_plausible_email("marie@.com"));
    }
}
