use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;

use crate::{
    api::{balance, dashboard, leave_request, leave_type, notification},
    auth::middleware::auth_middleware,
    config::Config,
};

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimiters {
    protected: Limiter,
    write: Limiter,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
            write: Arc::new(build_limiter(config.rate_write_per_min)?),
        })
    }
}

/// Milliseconds between replenished requests for a per-minute quota.
fn replenish_interval_ms(requests_per_min: u32) -> u64 {
    if requests_per_min == 0 {
        1
    } else {
        (60_000 / u64::from(requests_per_min)).max(1)
    }
}

fn build_limiter(
    requests_per_min: u32,
) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(replenish_interval_ms(requests_per_min))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min}/min"))?;
    Ok(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    let write_limiter = limiters.write.clone();

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::resource("/leave-types").route(web::get().to(leave_type::list_leave_types)),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .wrap(write_limiter.clone())
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/approvals, ahead of /leave/{id}
                    .service(
                        web::resource("/approvals")
                            .route(web::get().to(leave_request::approval_queue)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/approve")
                            .wrap(write_limiter.clone())
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .wrap(write_limiter.clone())
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .wrap(write_limiter.clone())
                            .route(web::put().to(leave_request::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/balance")
                    .service(web::resource("").route(web::get().to(balance::my_balances)))
                    .service(
                        web::resource("/provision")
                            .wrap(write_limiter.clone())
                            .route(web::post().to(balance::provision_user)),
                    )
                    .service(
                        web::resource("/provision/tenant")
                            .wrap(write_limiter.clone())
                            .route(web::post().to(balance::provision_tenant)),
                    )
                    .service(
                        web::resource("/{user_id}").route(web::get().to(balance::user_balances)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .service(
                        web::resource("").route(web::get().to(notification::list_notifications)),
                    )
                    .service(
                        web::resource("/unread-count")
                            .route(web::get().to(notification::unread_count)),
                    )
                    .service(
                        web::resource("/read-all").route(web::put().to(notification::mark_all_read)),
                    )
                    .service(
                        web::resource("/{id}/read").route(web::put().to(notification::mark_read)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::delete().to(notification::delete_notification)),
                    ),
            )
            .service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard))),
    );
}
