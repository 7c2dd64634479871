// Subscriber / recipient model (read-only views from the subscriber directory)

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Push,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Push => "push",
        }
    }
}

/// One delivery target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub channel: Channel,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Recipient {
    pub fn email(address: impl Into<String>) -> Self {
        Self {
            channel: Channel::Email,
            address: address.into(),
            user_id: None,
        }
    }

    pub fn push(token: impl Into<String>) -> Self {
        Self {
            channel: Channel::Push,
            address: token.into(),
            user_id: None,
        }
    }

    /// Stable key used for dedupe bookkeeping ("email:a@b.c")
    pub fn dedupe_key(&self) -> String {
        format!("{}:{}", self.channel.as_str(), self.address)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel.as_str(), self.address)
    }
}

/// Subscribers of a single event, per channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberSet {
    pub email: Vec<String>,
    pub push: Vec<String>,
}

impl SubscriberSet {
    /// One recipient per subscription entry (duplicates removed, order kept)
    pub fn recipients(&self) -> Vec<Recipient> {
        let mut seen = std::collections::HashSet::new();
        self.email
            .iter()
            .map(Recipient::email)
            .chain(self.push.iter().map(Recipient::push))
            .filter(|r| seen.insert(r.dedupe_key()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.email.len() + self.push.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Platform user (for deadline reminders)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl User {
    pub fn recipient(&self) -> Recipient {
        Recipient {
            channel: Channel::Email,
            address: self.email.clone(),
            user_id: Some(self.id.clone()),
        }
    }
}

/// Active weekly digest subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSubscriber {
    pub id: String,
    pub email: String,
}

impl DigestSubscriber {
    pub fn recipient(&self) -> Recipient {
        Recipient::email(self.email.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipients_flatten_and_dedupe() {
        let set = SubscriberSet {
            email: vec!["a@x.io".into(), "b@x.io".into(), "a@x.io".into()],
            push: vec!["tok-1".into()],
        };
        let recipients = set.recipients();
        assert_eq!(recipients.len(), 3);
        assert_eq!(recipients[0], Recipient::email("a@x.io"));
        assert_eq!(recipients[2].channel, Channel::Push);
    }

    #[test]
    fn test_same_address_on_different_channels_is_kept() {
        let set = SubscriberSet {
            email: vec!["x".into()],
            push: vec!["x".into()],
        };
        assert_eq!(set.recipients().len(), 2);
    }
}
