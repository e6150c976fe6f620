use std::time::Instant;
use surf::middleware::{Middleware, Next};
use surf::{Client, Request, Response};

/// Logs every request going through a `surf::Client`, with its status and latency.
#[derive(Debug, Default, Clone, Copy)]
pub struct SurfLogging;

#[surf::utils::async_trait]
impl Middleware for SurfLogging {
    async fn handle(&self, req: Request, client: Client, next: Next<'_>) -> surf::Result<Response> {
        let method = req.method();
        let url = req.url().to_string();
        log::debug!("--> {} {}", method, url);

        let start = Instant::now();
        let result = next.run(req, client).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(res) => log::debug!("<-- {} {} {} ({:?})", method, url, res.status(), elapsed),
            Err(err) => log::warn!("<-- {} {} failed after {:?}: {}", method, url, elapsed, err),
        }

        result
    }
}
