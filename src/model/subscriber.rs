use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::domain::EmailAddress;

/// Subscription state. Only `active` subscribers receive new-content
/// emails; `inactive` is set by bounce processing, `unsubscribed` by the
/// subscriber themselves (or complaint processing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberStatus {
    Active,
    Inactive,
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Unsubscribed => "unsubscribed",
        }
    }
}

impl fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriberStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "unsubscribed" => Ok(Self::Unsubscribed),
            other => Err(format!("{} is not a valid subscriber status", other)),
        }
    }
}

/// New subscription request.
/// The unsubscribe token is generated once at signup and stays stable for
/// the subscriber's lifetime; it is the sole self-service credential.
#[derive(Debug)]
pub struct NewSubscriber {
    pub email: EmailAddress,
    pub unsubscribe_token: String,
}

impl NewSubscriber {
    pub fn new(email: EmailAddress) -> Self {
        let unsubscribe_token = Uuid::new_v4().simple().to_string();
        Self {
            email,
            unsubscribe_token,
        }
    }
}

/// Stored subscriber record
#[derive(Debug, Clone, Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub status: SubscriberStatus,
    pub unsubscribe_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
