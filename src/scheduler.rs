use std::{future::Future, sync::Arc};

use anyhow::{Error, Result};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{logging, web::AppState};

/// 啟動排程，依 `cron_expr`（UTC，六欄）定期執行一輪含推播的掃描
pub async fn start(state: Arc<AppState>, cron_expr: &str) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await?;
    //                 sec  min   hour   day of month   month   day of week
    // 例如每五分鐘: "0 */5 * * * Mon-Fri"
    let job = create_job(cron_expr, move || {
        let state = state.clone();
        async move {
            let result = state.scanner.scan(state.notifier.as_ref(), false).await;
            logging::info_file_async(format!(
                "Scheduled scan finished, succeeded: {}, dips: {}",
                result.succeeded,
                result.dips.len()
            ));
            Ok(())
        }
    })?;

    sched.add(job).await?;
    sched.start().await?;
    logging::info_file_async(format!("Scheduled scans with cron '{}'", cron_expr));

    Ok(sched)
}

fn create_job<F, Fut>(cron_expr: &str, task: F) -> Result<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    let expr = cron_expr.to_string();
    Ok(Job::new_async(cron_expr, move |_uuid, _l| {
        let task = task.clone();
        let expr = expr.clone();
        Box::pin(async move {
            if let Err(why) = task().await {
                logging::error_file_async(format!(
                    "Failed to execute task({}) because {:?}",
                    expr, why
                ));
            }
        })
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_job_rejects_bad_expression() {
        assert!(create_job("not a cron", || async { Ok(()) }).is_err());
    }

    #[test]
    fn test_create_job_accepts_six_fields() {
        assert!(create_job("0 */5 * * * *", || async { Ok(()) }).is_ok());
    }
}
