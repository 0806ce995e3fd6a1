//! Status changes of a booking and their side effects.
//!
//! Every path that moves a booking through its lifecycle goes through
//! [`BookingWorkflow::transition`], so the allow-list on [`BookingStatus`] is the only
//! place transitions are decided.

use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    models::{
        auth::Role,
        booking::{Booking, BookingStatus},
        job::{Job, JOB_STATUS_CHANGED, JOB_TECHNICIAN_ASSIGNED},
        notification::Notification,
        technician::Technician,
    },
    ports::BookingRepository,
};
use crate::domain::services::notification_service::NotificationService;
use crate::error::AppError;

pub struct BookingWorkflow {
    bookings: Arc<dyn BookingRepository>,
    notifications: Arc<NotificationService>,
}

impl BookingWorkflow {
    pub fn new(bookings: Arc<dyn BookingRepository>, notifications: Arc<NotificationService>) -> Self {
        Self { bookings, notifications }
    }

    /// Moves `booking` to `next`.
    ///
    /// The assigned technician's availability is updated in the same transaction as the
    /// status write. `actor` is left out of the notification fan-out.
    pub async fn transition(&self, mut booking: Booking, next: BookingStatus, actor: Role) -> Result<Booking, AppError> {
        let previous = booking.status;
        if !previous.can_transition_to(next) {
            warn!("Rejected transition {} -> {} for booking {}", previous, next, booking.id);
            return Err(AppError::Validation(format!(
                "Invalid status transition from {} to {}",
                previous, next
            )));
        }
        if matches!(next, BookingStatus::Scheduled | BookingStatus::Accepted) && booking.technician_id.is_none() {
            return Err(AppError::Validation(format!("A technician must be assigned before the booking can be {}", next)));
        }

        booking.status = next;
        let technician_available = technician_availability_after(previous, next);
        let jobs = vec![Job::new(JOB_STATUS_CHANGED, booking.id.clone(), Utc::now())];
        let updated = self.bookings.save_transition(&booking, previous, technician_available, jobs).await?;

        info!("Booking {} moved {} -> {} by {}", updated.id, previous, next, actor);

        let message = format!("Booking for {} on {} at {} is now {}.", updated.service_name, updated.date, updated.time, next);
        self.notifications.notify_quietly(status_fan_out(&updated, actor, "Booking status updated", &message)).await;

        Ok(updated)
    }

    /// Assigns `technician` and schedules the booking.
    ///
    /// Rejects inactive technicians and technicians already holding another active booking
    /// in the same slot.
    pub async fn assign(&self, mut booking: Booking, technician: &Technician) -> Result<Booking, AppError> {
        if !matches!(booking.status, BookingStatus::Pending | BookingStatus::Scheduled) {
            return Err(AppError::Validation(format!(
                "Cannot assign a technician to a booking that is {}",
                booking.status
            )));
        }
        if !technician.is_active {
            return Err(AppError::Validation("Technician account is deactivated".into()));
        }
        if let Some(conflict) = self.bookings
            .find_technician_conflict(&technician.id, booking.date, &booking.time, &booking.id)
            .await?
        {
            warn!("Technician {} already holds booking {} at {} {}", technician.id, conflict.id, booking.date, booking.time);
            return Err(AppError::Validation(format!(
                "Technician {} already has a booking on {} at {}",
                technician.name, booking.date, booking.time
            )));
        }

        let previous = booking.status;
        booking.technician_id = Some(technician.id.clone());
        booking.status = BookingStatus::Scheduled;

        let now = Utc::now();
        let jobs = vec![
            Job::new(JOB_TECHNICIAN_ASSIGNED, booking.id.clone(), now),
            Job::new(JOB_STATUS_CHANGED, booking.id.clone(), now),
        ];
        let updated = self.bookings.save_transition(&booking, previous, None, jobs).await?;

        info!("Booking {} assigned to technician {} ({} -> Scheduled)", updated.id, technician.id, previous);

        self.notifications.notify_quietly(vec![
            Notification::new(
                Role::Technician,
                Some(technician.id.clone()),
                "New job assigned",
                format!("{} on {} at {} at {}.", updated.service_name, updated.date, updated.time, updated.address),
            ).for_booking(&updated.id),
            Notification::new(
                Role::User,
                Some(updated.user_id.clone()),
                "Technician assigned",
                format!("{} will handle your {} booking on {} at {}.", technician.name, updated.service_name, updated.date, updated.time),
            ).for_booking(&updated.id),
        ]).await;

        Ok(updated)
    }
}

/// Availability the assigned technician ends up with after `previous -> next`.
/// Accepting a job occupies the technician until it completes or is cancelled.
fn technician_availability_after(previous: BookingStatus, next: BookingStatus) -> Option<bool> {
    match next {
        BookingStatus::Accepted => Some(false),
        BookingStatus::Completed => Some(true),
        BookingStatus::Cancelled if matches!(previous, BookingStatus::Accepted | BookingStatus::InProgress) => Some(true),
        _ => None,
    }
}

/// Notifications for a status change, skipping whoever made it.
fn status_fan_out(booking: &Booking, actor: Role, title: &str, message: &str) -> Vec<Notification> {
    let mut out = Vec::new();
    if actor != Role::User {
        out.push(Notification::new(Role::User, Some(booking.user_id.clone()), title, message).for_booking(&booking.id));
    }
    if actor != Role::Technician
        && let Some(technician_id) = &booking.technician_id
    {
        out.push(Notification::new(Role::Technician, Some(technician_id.clone()), title, message).for_booking(&booking.id));
    }
    if actor != Role::Admin {
        out.push(Notification::new(Role::Admin, None, title, message).for_booking(&booking.id));
    }
    out
}
