// Source classification and field extraction
//
// Decides which source family a raw event belongs to and pulls out the
// fields the rest of the pipeline needs. Missing string fields become
// "unknown"; a missing event time becomes the processing time.
//
// Order matters: GuardDuty findings arrive through EventBridge and also carry
// `source`, so the `detail.type` check runs first.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::content::classify_content;
use crate::error::{ProcessError, Result};
use crate::event::{
    AwsEventFields, CloudTrailFields, EventDetails, GenericFields, GuardDutyFields, UNKNOWN,
};

/// Classify a raw event and extract its source-specific fields
pub fn classify(raw: &Value, now: DateTime<Utc>) -> Result<EventDetails> {
    let object = raw
        .as_object()
        .ok_or_else(|| ProcessError::NotAnObject(json_kind(raw)))?;
    let now = now.to_rfc3339();

    if let Some(detail) = object.get("detail").filter(|d| d.get("type").is_some()) {
        return Ok(EventDetails::GuardDutyFinding(guardduty_fields(
            detail, &now,
        )));
    }

    if object.contains_key("source") {
        return Ok(EventDetails::AwsEvent(aws_event_fields(object, &now)));
    }

    if let Some(record) = object
        .get("Records")
        .and_then(Value::as_array)
        .and_then(|records| records.first())
    {
        return Ok(EventDetails::CloudTrailEvent(cloudtrail_fields(
            record, &now,
        )));
    }

    Ok(EventDetails::GenericEvent(generic_fields(raw, object)))
}

fn aws_event_fields(event: &Map<String, Value>, now: &str) -> AwsEventFields {
    AwsEventFields {
        source: text_or_unknown(event.get("source")),
        detail_type: text_or_unknown(event.get("detail-type")),
        account: text_or_unknown(event.get("account")),
        region: text_or_unknown(event.get("region")),
        event_time: text(event.get("time")).unwrap_or_else(|| now.to_string()),
        resources: array(event.get("resources")),
    }
}

fn guardduty_fields(detail: &Value, now: &str) -> GuardDutyFields {
    let service = detail.get("service").unwrap_or(&Value::Null);

    GuardDutyFields {
        finding_id: text_or_unknown(detail.get("id")),
        finding_type: text_or_unknown(detail.get("type")),
        severity: number(detail.get("severity")).unwrap_or(0.0),
        confidence: number(detail.get("confidence")).unwrap_or(0.0),
        account: text_or_unknown(detail.get("accountId")),
        region: text_or_unknown(detail.get("region")),
        event_time: text(detail.get("createdAt")).unwrap_or_else(|| now.to_string()),
        resource_type: text_or_unknown(detail.pointer("/resource/resourceType")),
        source_ip: guardduty_source_ip(service),
        user_identity: service
            .pointer("/action/awsApiCallAction/userDetails")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        action: service
            .get("action")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        count: service.get("count").and_then(Value::as_u64).unwrap_or(1),
    }
}

/// GuardDuty places the remote address differently per action type
fn guardduty_source_ip(service: &Value) -> Option<String> {
    [
        "/remoteIpDetails/ipAddressV4",
        "/action/networkConnectionAction/remoteIpDetails/ipAddressV4",
        "/action/awsApiCallAction/remoteIpDetails/ipAddressV4",
    ]
    .iter()
    .find_map(|pointer| text(service.pointer(pointer)))
}

fn cloudtrail_fields(record: &Value, now: &str) -> CloudTrailFields {
    CloudTrailFields {
        event_name: text_or_unknown(record.get("eventName")),
        event_source: text_or_unknown(record.get("eventSource")),
        source_ip: text_or_unknown(record.get("sourceIPAddress")),
        user_agent: text_or_unknown(record.get("userAgent")),
        user_identity: record
            .get("userIdentity")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        event_time: text(record.get("eventTime")).unwrap_or_else(|| now.to_string()),
        aws_region: text_or_unknown(record.get("awsRegion")),
        error_code: text(record.get("errorCode")),
        error_message: text(record.get("errorMessage")),
        read_only: record
            .get("readOnly")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        resources: array(record.get("resources")),
    }
}

fn generic_fields(raw: &Value, event: &Map<String, Value>) -> GenericFields {
    GenericFields {
        event_time: text(event.get("timestamp")).or_else(|| text(event.get("time"))),
        source_ip: text(event.get("source_ip")).or_else(|| text(event.get("sourceIPAddress"))),
        customer_id: text(event.get("customer_id")),
        threat_analysis: classify_content(raw),
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_or_unknown(value: Option<&Value>) -> String {
    text(value).unwrap_or_else(|| UNKNOWN.to_string())
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn array(value: Option<&Value>) -> Vec<Value> {
    value
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn guardduty_finding_wins_over_source() {
        // Findings also carry `source`, so `detail.type` must be checked first
        let raw = json!({
            "source": "aws.guardduty",
            "detail-type": "GuardDuty Finding",
            "detail": {
                "id": "f-1",
                "type": "UnauthorizedAPICall:EC2/MaliciousIPCaller.Custom",
                "severity": 8.5,
                "confidence": 9.2,
                "accountId": "643275918916",
                "region": "us-east-1",
                "createdAt": "2024-01-15T03:00:00Z",
                "resource": { "resourceType": "EC2Instance" },
                "service": {
                    "action": {
                        "awsApiCallAction": {
                            "remoteIpDetails": { "ipAddressV4": "10.0.0.50" },
                            "userDetails": { "userName": "mallory" }
                        }
                    },
                    "count": 3
                }
            }
        });

        let EventDetails::GuardDutyFinding(fields) = classify(&raw, now()).unwrap() else {
            panic!("expected GuardDuty finding");
        };
        assert_eq!(fields.finding_id, "f-1");
        assert_eq!(fields.severity, 8.5);
        assert_eq!(fields.resource_type, "EC2Instance");
        assert_eq!(fields.source_ip.as_deref(), Some("10.0.0.50"));
        assert_eq!(fields.user_identity["userName"], "mallory");
        assert_eq!(fields.count, 3);
        assert_eq!(fields.event_time, "2024-01-15T03:00:00Z");
    }

    #[test]
    fn guardduty_prefers_service_level_remote_ip() {
        let raw = json!({
            "detail": {
                "type": "Recon:EC2/PortProbeUnprotectedPort",
                "service": {
                    "remoteIpDetails": { "ipAddressV4": "198.51.100.1" },
                    "action": {
                        "networkConnectionAction": {
                            "remoteIpDetails": { "ipAddressV4": "198.51.100.2" }
                        }
                    }
                }
            }
        });

        let details = classify(&raw, now()).unwrap();
        assert_eq!(details.source_ip(), Some("198.51.100.1"));
        assert_eq!(details.account(), Some("unknown"));
        assert_eq!(details.severity(), Some(0.0));
        assert_eq!(details.event_time(), Some("2024-01-15T14:30:00+00:00"));
    }

    #[test]
    fn aws_event_defaults_missing_fields() {
        let raw = json!({ "source": "aws.signin", "region": "us-east-1" });

        let EventDetails::AwsEvent(fields) = classify(&raw, now()).unwrap() else {
            panic!("expected AWS event");
        };
        assert_eq!(fields.source, "aws.signin");
        assert_eq!(fields.detail_type, "unknown");
        assert_eq!(fields.account, "unknown");
        assert_eq!(fields.region, "us-east-1");
        assert!(fields.resources.is_empty());
    }

    #[test]
    fn cloudtrail_uses_first_record() {
        let raw = json!({
            "Records": [
                {
                    "eventName": "CreateUser",
                    "eventSource": "iam.amazonaws.com",
                    "sourceIPAddress": "192.168.1.100",
                    "eventTime": "2024-01-15T23:10:00Z",
                    "awsRegion": "us-east-1",
                    "errorCode": "AccessDenied",
                    "readOnly": false
                },
                { "eventName": "DeleteUser" }
            ]
        });

        let EventDetails::CloudTrailEvent(fields) = classify(&raw, now()).unwrap() else {
            panic!("expected CloudTrail event");
        };
        assert_eq!(fields.event_name, "CreateUser");
        assert_eq!(fields.source_ip, "192.168.1.100");
        assert_eq!(fields.user_agent, "unknown");
        assert_eq!(fields.error_code.as_deref(), Some("AccessDenied"));
        assert!(fields.error_message.is_none());
        assert!(!fields.read_only);
    }

    #[test]
    fn empty_records_fall_back_to_generic() {
        let details = classify(&json!({ "Records": [] }), now()).unwrap();
        assert_eq!(details.event_type(), "generic_event");
    }

    #[test]
    fn flat_event_is_classified_by_content() {
        let raw = json!({
            "event_id": "evt-123456",
            "timestamp": "2024-01-15T14:00:00",
            "event_type": "malware_detected",
            "source_ip": "172.16.0.10",
            "customer_id": "customer-001"
        });

        let EventDetails::GenericEvent(fields) = classify(&raw, now()).unwrap() else {
            panic!("expected generic event");
        };
        assert_eq!(fields.customer_id.as_deref(), Some("customer-001"));
        assert_eq!(fields.source_ip.as_deref(), Some("172.16.0.10"));
        assert_eq!(fields.threat_analysis.risk_score, 25);
    }

    #[test]
    fn non_objects_are_rejected() {
        let err = classify(&json!([1, 2]), now()).unwrap_err();
        assert!(matches!(err, ProcessError::NotAnObject("array")));
    }
}
