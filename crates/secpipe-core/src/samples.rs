//! Synthetic security events
//!
//! `validation_events` returns the fixed payloads the validation harness puts
//! on the stream. `EventGenerator` produces random traffic for demos and load
//! testing.

use chrono::{SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use uuid::Uuid;

/// A named payload ready to be put on the stream
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEvent {
    pub name: &'static str,
    pub payload: Value,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// The three validation payloads, in dispatch order
///
/// Every call yields fresh ids and current timestamps.
pub fn validation_events() -> Vec<SampleEvent> {
    vec![
        SampleEvent {
            name: "CloudTrail High-Risk Event",
            payload: cloudtrail_create_user(),
        },
        SampleEvent {
            name: "GuardDuty High-Severity Finding",
            payload: guardduty_malicious_caller(),
        },
        SampleEvent {
            name: "Normal AWS Console Login",
            payload: console_login(),
        },
    ]
}

fn cloudtrail_create_user() -> Value {
    json!({
        "Records": [{
            "eventVersion": "1.05",
            "userIdentity": {
                "type": "IAMUser",
                "principalId": "AIDACKCEVSQ6C2EXAMPLE",
                "arn": "arn:aws:iam::123456789012:user/test-user",
                "accountId": "123456789012",
                "userName": "test-user"
            },
            "eventTime": now_rfc3339(),
            "eventSource": "iam.amazonaws.com",
            "eventName": "CreateUser",
            "awsRegion": "us-east-1",
            "sourceIPAddress": "192.168.1.100",
            "userAgent": "aws-cli/2.0.0",
            "requestParameters": { "userName": "suspicious-user" },
            "responseElements": null,
            "requestID": new_id(),
            "eventID": new_id(),
            "eventType": "AwsApiCall",
            "readOnly": false,
            "resources": [{
                "ARN": "arn:aws:iam::123456789012:user/suspicious-user",
                "accountId": "123456789012",
                "type": "AWS::IAM::User"
            }]
        }]
    })
}

fn guardduty_malicious_caller() -> Value {
    let now = now_rfc3339();
    json!({
        "version": "0",
        "id": new_id(),
        "detail-type": "GuardDuty Finding",
        "source": "aws.guardduty",
        "account": "643275918916",
        "time": now,
        "region": "us-east-1",
        "detail": {
            "schemaVersion": "2.0",
            "accountId": "643275918916",
            "region": "us-east-1",
            "partition": "aws",
            "id": new_id(),
            "arn": format!(
                "arn:aws:guardduty:us-east-1:643275918916:detector/finding/{}",
                new_id()
            ),
            "type": "UnauthorizedAPICall:EC2/MaliciousIPCaller.Custom",
            "resource": {
                "resourceType": "EC2Instance",
                "instanceDetails": {
                    "instanceId": "i-1234567890abcdef0",
                    "instanceType": "t2.micro"
                }
            },
            "service": {
                "action": {
                    "actionType": "AWS_API_CALL",
                    "awsApiCallAction": {
                        "api": "RunInstances",
                        "serviceName": "ec2.amazonaws.com",
                        "remoteIpDetails": {
                            "ipAddressV4": "10.0.0.50",
                            "organization": {
                                "asn": "16509",
                                "asnOrg": "AMAZON-02",
                                "isp": "Amazon.com",
                                "org": "Amazon.com"
                            }
                        }
                    }
                },
                "count": 1
            },
            "severity": 8.5,
            "confidence": 9.2,
            "createdAt": now,
            "updatedAt": now,
            "title": "EC2 instance launched from malicious IP",
            "description": "An EC2 instance was launched from a known malicious IP address."
        }
    })
}

fn console_login() -> Value {
    let now = now_rfc3339();
    json!({
        "version": "0",
        "id": new_id(),
        "detail-type": "AWS Console Sign In",
        "source": "aws.signin",
        "account": "643275918916",
        "time": now,
        "region": "us-east-1",
        "detail": {
            "eventVersion": "1.05",
            "userIdentity": {
                "type": "IAMUser",
                "principalId": "AIDACKCEVSQ6C2EXAMPLE",
                "arn": "arn:aws:iam::643275918916:user/normal-user",
                "accountId": "643275918916",
                "userName": "normal-user"
            },
            "eventTime": now,
            "eventSource": "signin.amazonaws.com",
            "eventName": "ConsoleLogin",
            "awsRegion": "us-east-1",
            "sourceIPAddress": "203.0.113.12",
            "userAgent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            "responseElements": { "ConsoleLogin": "Success" },
            "requestID": new_id(),
            "eventID": new_id(),
            "eventType": "AwsConsoleSignIn",
            "readOnly": false
        }
    })
}

const EVENT_TYPES: &[&str] = &[
    "failed_login",
    "successful_login",
    "malware_detected",
    "network_anomaly",
    "privilege_escalation",
    "data_access",
    "system_change",
    "policy_violation",
];

const SEVERITY_LEVELS: &[&str] = &["low", "medium", "high", "critical"];

const SOURCE_IPS: &[&str] = &[
    "192.168.1.100",
    "192.168.1.101",
    "192.168.1.102",
    "10.0.0.50",
    "10.0.0.51",
    "10.0.0.52",
    "172.16.0.10",
    "172.16.0.11",
];

const CUSTOMER_IDS: &[&str] = &[
    "customer-001",
    "customer-002",
    "customer-003",
    "customer-004",
    "customer-005",
];

const MALWARE_TYPES: &[&str] = &["trojan", "virus", "ransomware", "spyware"];

const CLOUDTRAIL_CALLS: &[(&str, &str)] = &[
    ("ConsoleLogin", "signin.amazonaws.com"),
    ("CreateUser", "iam.amazonaws.com"),
    ("AttachUserPolicy", "iam.amazonaws.com"),
    ("RunInstances", "ec2.amazonaws.com"),
    ("GetObject", "s3.amazonaws.com"),
    ("PutBucketPolicy", "s3.amazonaws.com"),
    ("StopLogging", "cloudtrail.amazonaws.com"),
];

const ERROR_CODES: &[&str] = &["AccessDenied", "UnauthorizedOperation"];

const GUARDDUTY_FINDING_TYPES: &[&str] = &[
    "UnauthorizedAPICall:EC2/TorIPCaller",
    "CryptoCurrency:EC2/BitcoinTool.B!DNS",
    "Backdoor:EC2/C&CActivity.B!DNS",
    "Stealth:IAMUser/CloudTrailLoggingDisabled",
    "InstanceCredentialExfiltration:IAMUser/AnomalousBehavior",
    "Policy:IAMUser/RootCredentialUsage",
    "Impact:EC2/WinRMBruteForce",
    "Persistence:IAMUser/NetworkPermissions",
    "Discovery:S3/BucketEnumeration.Unusual",
];

const GUARDDUTY_RESOURCE_TYPES: &[&str] = &["Instance", "S3Bucket", "AccessKey"];

/// Random security event source
pub struct EventGenerator {
    rng: StdRng,
}

impl Default for EventGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests and reproducible demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, values: &[&'static str]) -> &'static str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }

    /// Flat application security event
    pub fn security_event(&mut self) -> Value {
        let now = Utc::now();
        let event_type = self.pick(EVENT_TYPES);

        let mut event = json!({
            "event_id": format!("evt-{}", self.rng.gen_range(100_000..=999_999)),
            "timestamp": now.to_rfc3339_opts(SecondsFormat::Millis, true),
            "event_type": event_type,
            "severity": self.pick(SEVERITY_LEVELS),
            "source_ip": self.pick(SOURCE_IPS),
            "customer_id": self.pick(CUSTOMER_IDS),
            "user_id": format!("user-{}", self.rng.gen_range(1000..=9999)),
            "resource": format!("resource-{}", self.rng.gen_range(100..=999)),
            "description": format!("Security event detected at {}", now.format("%H:%M:%S")),
            "metadata": {
                "source": "secpipe-producer",
                "version": "1.0",
                "region": "us-east-1"
            }
        });

        let extra = match event_type {
            "failed_login" => Some(json!({
                "failed_attempts": self.rng.gen_range(1..=10),
                "risk_score": self.rng.gen_range(30..=90),
                "message": "authentication failed"
            })),
            "malware_detected" => Some(json!({
                "malware_type": self.pick(MALWARE_TYPES),
                "risk_score": self.rng.gen_range(70..=100)
            })),
            "network_anomaly" => Some(json!({
                "bytes_transferred": self.rng.gen_range(1_000_000..=10_000_000),
                "risk_score": self.rng.gen_range(40..=80),
                "message": "unusual traffic"
            })),
            _ => None,
        };

        if let (Some(Value::Object(extra)), Some(target)) = (extra, event.as_object_mut()) {
            target.extend(extra);
        }

        event
    }

    /// CloudTrail-shaped event wrapped in a `Records` envelope
    pub fn cloudtrail_event(&mut self) -> Value {
        let (event_name, event_source) = *CLOUDTRAIL_CALLS
            .choose(&mut self.rng)
            .unwrap_or(&CLOUDTRAIL_CALLS[0]);
        let failed = self.rng.gen_bool(0.2);

        let mut record = json!({
            "eventVersion": "1.08",
            "userIdentity": {
                "type": "IAMUser",
                "accountId": "123456789012",
                "userName": format!("user-{}", self.rng.gen_range(1000..=9999))
            },
            "eventTime": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "eventSource": event_source,
            "eventName": event_name,
            "awsRegion": "us-east-1",
            "sourceIPAddress": self.pick(SOURCE_IPS),
            "userAgent": "aws-cli/2.15.0",
            "eventID": Uuid::new_v4().to_string(),
            "readOnly": event_name.starts_with("Get"),
        });

        if failed {
            if let Some(target) = record.as_object_mut() {
                target.insert("errorCode".into(), json!(self.pick(ERROR_CODES)));
                target.insert(
                    "errorMessage".into(),
                    json!(format!("User is not authorized to perform {event_name}")),
                );
            }
        }

        json!({ "Records": [record] })
    }

    /// GuardDuty finding as delivered by EventBridge
    pub fn guardduty_finding(&mut self) -> Value {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let finding_id = Uuid::new_v4().to_string();
        let severity = f64::from(self.rng.gen_range(10..=90_u8)) / 10.0;
        let confidence = f64::from(self.rng.gen_range(50..=100_u8)) / 10.0;

        json!({
            "version": "0",
            "id": Uuid::new_v4().to_string(),
            "detail-type": "GuardDuty Finding",
            "source": "aws.guardduty",
            "account": "123456789012",
            "time": now,
            "region": "us-east-1",
            "detail": {
                "schemaVersion": "2.0",
                "accountId": "123456789012",
                "region": "us-east-1",
                "partition": "aws",
                "id": finding_id,
                "arn": format!(
                    "arn:aws:guardduty:us-east-1:123456789012:detector/finding/{finding_id}"
                ),
                "type": self.pick(GUARDDUTY_FINDING_TYPES),
                "resource": { "resourceType": self.pick(GUARDDUTY_RESOURCE_TYPES) },
                "service": {
                    "action": {
                        "actionType": "NETWORK_CONNECTION",
                        "networkConnectionAction": {
                            "connectionDirection": "INBOUND",
                            "remoteIpDetails": { "ipAddressV4": self.pick(SOURCE_IPS) }
                        }
                    },
                    "count": self.rng.gen_range(1..=20)
                },
                "severity": severity,
                "confidence": confidence,
                "createdAt": now,
                "updatedAt": now
            }
        })
    }

    /// Mix of event shapes: about one in four CloudTrail, one in eight
    /// GuardDuty, the rest flat events
    pub fn next_event(&mut self) -> Value {
        match self.rng.gen_range(0..8) {
            0 | 1 => self.cloudtrail_event(),
            2 => self.guardduty_finding(),
            _ => self.security_event(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventDetails;
    use crate::processor::EventProcessor;

    #[test]
    fn validation_events_are_in_dispatch_order() {
        let events = validation_events();
        let names: Vec<_> = events.iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            [
                "CloudTrail High-Risk Event",
                "GuardDuty High-Severity Finding",
                "Normal AWS Console Login"
            ]
        );
    }

    #[test]
    fn validation_events_classify_as_intended() {
        let processor = EventProcessor::default();
        let kinds: Vec<_> = validation_events()
            .into_iter()
            .map(|e| processor.process(e.payload).unwrap().details.event_type())
            .collect();
        assert_eq!(kinds, ["cloudtrail_event", "guardduty_finding", "aws_event"]);
    }

    #[test]
    fn validation_events_use_fresh_ids() {
        let a = validation_events();
        let b = validation_events();
        assert_ne!(
            a[0].payload["Records"][0]["eventID"],
            b[0].payload["Records"][0]["eventID"]
        );
        assert_ne!(a[1].payload["detail"]["id"], b[1].payload["detail"]["id"]);
    }

    #[test]
    fn seeded_generator_is_reproducible() {
        let mut a = EventGenerator::seeded(7);
        let mut b = EventGenerator::seeded(7);
        let first = a.security_event();
        let second = b.security_event();
        assert_eq!(first["event_id"], second["event_id"]);
        assert_eq!(first["event_type"], second["event_type"]);
        assert_eq!(first["source_ip"], second["source_ip"]);
    }

    #[test]
    fn generated_events_are_processable() {
        let processor = EventProcessor::default();
        let mut generator = EventGenerator::seeded(42);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let event = processor.process(generator.next_event()).unwrap();
            assert!(event.risk_score <= 100);
            seen.insert(event.details.event_type());
            match &event.details {
                EventDetails::GenericEvent(fields) => {
                    assert!(fields.customer_id.is_some());
                }
                EventDetails::CloudTrailEvent(fields) => {
                    assert_eq!(fields.aws_region, "us-east-1");
                }
                EventDetails::GuardDutyFinding(fields) => {
                    assert!((1.0..=9.0).contains(&fields.severity));
                    assert!(fields.source_ip.is_some());
                }
                other => panic!("unexpected event type {}", other.event_type()),
            }
        }
        assert!(seen.contains("guardduty_finding"));
        assert!(seen.contains("cloudtrail_event"));
        assert!(seen.contains("generic_event"));
    }

    #[test]
    fn generated_findings_reach_the_alert_path() {
        let processor = EventProcessor::default();
        let policy = crate::alert::AlertPolicy::default();
        let mut generator = EventGenerator::seeded(3);

        let alerted = (0..100)
            .map(|_| processor.process(generator.guardduty_finding()).unwrap())
            .filter(|event| policy.should_alert(event))
            .count();
        assert!(alerted > 0);
    }
}
