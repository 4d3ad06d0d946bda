use anyhow::{anyhow, Result};
use statsd::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct MetricsService {
    client: Arc<Client>,
}

impl MetricsService {
    pub fn new(host: &str, port: u16, prefix: &str) -> Result<Self> {
        let client = Client::new(format!("{}:{}", host, port), prefix)
            .map_err(|e| anyhow!("creating statsd client for {}:{}: {:?}", host, port, e))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn increment(&self, metric: &str, tags: Option<&HashMap<String, String>>) {
        self.client.incr(&metric_name(metric, tags));
    }

    pub fn timing(&self, metric: &str, duration: Duration, tags: Option<&HashMap<String, String>>) {
        self.client
            .timer(&metric_name(metric, tags), duration.as_millis() as f64);
    }
}

pub fn endpoint_tags(endpoint: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    tags.insert("endpoint".to_string(), endpoint.to_string());
    tags
}

fn metric_name(metric: &str, tags: Option<&HashMap<String, String>>) -> String {
    match tags {
        Some(tags) if !tags.is_empty() => {
            let mut pairs = tags
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<String>>();
            pairs.sort();
            format!("{}#{}", metric, pairs.join(","))
        }
        _ => metric.to_string(),
    }
}
