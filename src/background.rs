use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn, info_span, Instrument};
use crate::state::AppState;
use crate::domain::models::job::{Job, JOB_BOOKING_CREATED, JOB_STATUS_CHANGED, JOB_TECHNICIAN_ASSIGNED};
use crate::error::AppError;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const BATCH_SIZE: i32 = 10;

pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting background job worker...");

    loop {
        run_pending_jobs(&state).await;
        sleep(POLL_INTERVAL).await;
    }
}

/// Claims and processes one batch of due jobs.
pub async fn run_pending_jobs(state: &Arc<AppState>) {
    match state.job_repo.find_pending(BATCH_SIZE).await {
        Ok(jobs) => {
            for job in jobs {
                let span = info_span!(
                    "background_job",
                    job_id = %job.id,
                    job_type = %job.job_type,
                    booking_id = %job.payload.booking_id
                );

                async {
                    info!("Processing job: {}", job.job_type);
                    match process_job(state, &job).await {
                        Ok(_) => {
                            info!("Job completed successfully");
                            if let Err(e) = state.job_repo.update_status(&job.id, "COMPLETED", None).await {
                                error!("Failed to mark job as completed: {:?}", e);
                            }
                        },
                        Err(e) => {
                            let err_msg = format!("{}", e);
                            error!("Job failed with error: {}", err_msg);
                            if let Err(up_err) = state.job_repo.update_status(&job.id, "FAILED", Some(err_msg)).await {
                                error!("Failed to mark job as failed: {:?}", up_err);
                            }
                        }
                    }
                }
                    .instrument(span)
                    .await;
            }
        }
        Err(e) => error!("Failed to fetch pending jobs: {:?}", e),
    }
}

async fn process_job(state: &Arc<AppState>, job: &Job) -> Result<(), AppError> {
    let booking_id = &job.payload.booking_id;

    let Some(details) = state.booking_repo.find_details(booking_id).await? else {
        warn!("Booking {} no longer exists. Skipping email.", booking_id);
        return Ok(());
    };
    let booking = &details.booking;

    let mut context = tera::Context::new();
    context.insert("customer_name", &details.customer_name.clone().unwrap_or_default());
    context.insert("customer_phone", &details.customer_phone.clone().unwrap_or_default());
    context.insert("technician_name", &details.technician_name);
    context.insert("service_name", &booking.service_name);
    context.insert("date", &booking.date.format("%Y-%m-%d").to_string());
    context.insert("time", &booking.time);
    context.insert("address", &booking.address);
    context.insert("amount", &format!("{:.2}", booking.amount));
    context.insert("status", booking.status.as_str());
    context.insert("dashboard_link", &format!("{}/dashboard", state.config.frontend_url));

    let (recipient, subject, template) = match job.job_type.as_str() {
        JOB_BOOKING_CREATED => (
            details.customer_email.clone(),
            format!("Booking received: {}", booking.service_name),
            "booking_created.html",
        ),
        JOB_STATUS_CHANGED => (
            details.customer_email.clone(),
            format!("Your booking is now {}", booking.status),
            "status_changed.html",
        ),
        JOB_TECHNICIAN_ASSIGNED => {
            let technician_id = booking.technician_id.as_deref()
                .ok_or(AppError::Validation("Booking has no technician".into()))?;
            let technician = state.technician_repo.find_by_id(technician_id).await?
                .ok_or(AppError::NotFound(format!("Technician {} not found", technician_id)))?;
            (Some(technician.email), format!("New job: {}", booking.service_name), "technician_assigned.html")
        }
        other => return Err(AppError::InternalWithMsg(format!("Unknown job type {}", other))),
    };

    let Some(recipient) = recipient else {
        warn!("No recipient for job {}. Skipping email.", job.id);
        return Ok(());
    };

    let body = state.templates.render(template, &context)
        .map_err(|e| AppError::InternalWithMsg(format!("Tera render error: {:?}", e)))?;

    info!("Sending {} email to {}", job.job_type, recipient);
    state.email_service.send(&recipient, &subject, &body).await
}
