use async_trait::async_trait;
use beacon_core::{ContentItem, HandlerFault, ResourceFetchResult};
use chrono::{Local, NaiveTime, Timelike};

use crate::router::ResourceHandler;
use crate::template::ResourceParams;

const ANONYMOUS: &str = "stranger";

pub struct Greeting;

#[async_trait]
impl ResourceHandler for Greeting {
    async fn read(
        &self,
        uri: &str,
        params: &ResourceParams,
    ) -> Result<ResourceFetchResult, HandlerFault> {
        let name = params
            .get_str("name")
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS);
        let message = greet(name, Local::now().time());
        Ok(ResourceFetchResult::single(
            ContentItem::text(uri, message).with_mime_type("text/plain"),
        ))
    }
}

fn salutation(hour: u32) -> &'static str {
    match hour {
        0..6 => "Good early morning",
        6..12 => "Good morning",
        12..18 => "Good afternoon",
        _ => "Good evening",
    }
}

fn greet(name: &str, now: NaiveTime) -> String {
    format!(
        "{}, {name}! The current time is {}.",
        salutation(now.hour()),
        now.format("%H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::UriTemplate;

    #[test]
    fn salutation_follows_the_clock() {
        assert_eq!(salutation(0), "Good early morning");
        assert_eq!(salutation(5), "Good early morning");
        assert_eq!(salutation(6), "Good morning");
        assert_eq!(salutation(12), "Good afternoon");
        assert_eq!(salutation(17), "Good afternoon");
        assert_eq!(salutation(18), "Good evening");
        assert_eq!(salutation(23), "Good evening");
    }

    #[test]
    fn greeting_includes_name_and_time() {
        let now = NaiveTime::from_hms_opt(9, 5, 30).unwrap();
        assert_eq!(
            greet("Alice", now),
            "Good morning, Alice! The current time is 09:05:30."
        );
    }

    #[tokio::test]
    async fn reads_greeting_for_bound_name() {
        let params = UriTemplate::parse("greeting://{name}")
            .unwrap()
            .matches("greeting://Alice")
            .unwrap();
        let result = Greeting.read("greeting://Alice", &params).await.unwrap();
        assert_eq!(result.contents.len(), 1);

        let item = &result.contents[0];
        assert_eq!(item.uri, "greeting://Alice");
        assert_eq!(item.mime_type.as_deref(), Some("text/plain"));
        assert!(item.as_text().unwrap().contains(", Alice! The current time is "));
    }

    #[tokio::test]
    async fn missing_name_falls_back_to_anonymous() {
        let result = Greeting
            .read("greeting://", &ResourceParams::default())
            .await
            .unwrap();
        assert!(result.contents[0].as_text().unwrap().contains("stranger"));
    }
}
