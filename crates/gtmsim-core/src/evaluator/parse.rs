//! Strict parsing of oracle replies into typed payloads.
//!
//! Replies arrive as free-form text that should contain one JSON object,
//! sometimes wrapped in prose or a code fence. Extraction finds the object;
//! the per-role parsers then enforce the believable-range schema. Any
//! miss — absent object, unknown verdict, out-of-range number — yields a
//! validation failure string, never a panic.

use regex::Regex;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::domain::decision::{
    BuyerVerdict, CompetitorReaction, DecisionPayload, WillingnessToPay,
};

/// Matches the outermost brace-delimited span in a reply.
fn json_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"))
}

/// Extract the JSON object embedded in a reply, if any.
pub fn extract_json(text: &str) -> Option<&str> {
    json_object_re().find(text).map(|m| m.as_str())
}

fn parse_object<'a, T: Deserialize<'a>>(text: &'a str) -> Result<T, String> {
    let json = extract_json(text).ok_or_else(|| "no JSON object in reply".to_string())?;
    serde_json::from_str(json).map_err(|e| format!("reply is not valid JSON: {e}"))
}

fn check_unit_range(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(format!("{name} {value} outside [0, 1]"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct BuyerReply {
    decision: String,
    confidence: f64,
    #[serde(default)]
    objections: Vec<String>,
    #[serde(default)]
    willingness_to_pay: Option<WtpReply>,
    #[serde(default)]
    perceived_value_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WtpReply {
    min: f64,
    max: f64,
    ideal: f64,
}

pub fn parse_buyer(text: &str) -> Result<DecisionPayload, String> {
    let reply: BuyerReply = parse_object(text)?;

    let verdict = match reply.decision.trim().to_ascii_uppercase().as_str() {
        "BUY" => BuyerVerdict::Buy,
        "PASS" => BuyerVerdict::Pass,
        "OBJECT" => BuyerVerdict::Object,
        other => return Err(format!("unknown buyer decision {other:?}")),
    };
    check_unit_range("confidence", reply.confidence)?;

    let willingness_to_pay = match reply.willingness_to_pay {
        Some(wtp) => {
            if !(wtp.min.is_finite() && wtp.max.is_finite() && wtp.ideal.is_finite())
                || wtp.min < 0.0
                || wtp.min > wtp.max
                || wtp.ideal < wtp.min
                || wtp.ideal > wtp.max
            {
                return Err(format!(
                    "implausible willingness_to_pay range {}..{} (ideal {})",
                    wtp.min, wtp.max, wtp.ideal
                ));
            }
            Some(WillingnessToPay {
                min: wtp.min,
                max: wtp.max,
                ideal: wtp.ideal,
            })
        }
        None => None,
    };

    let perceived_value = match reply.perceived_value_score {
        Some(score) => {
            if !score.is_finite() || !(1.0..=10.0).contains(&score) {
                return Err(format!("perceived_value_score {score} outside [1, 10]"));
            }
            Some(score.round() as u8)
        }
        None => None,
    };

    Ok(DecisionPayload::Buyer {
        verdict,
        objections: reply.objections,
        confidence: reply.confidence,
        willingness_to_pay,
        perceived_value,
    })
}

#[derive(Debug, Deserialize)]
struct CompetitorReply {
    response_type: String,
    confidence: f64,
    threat_level: f64,
    #[serde(default)]
    counter_moves: Vec<String>,
}

pub fn parse_competitor(text: &str) -> Result<DecisionPayload, String> {
    let reply: CompetitorReply = parse_object(text)?;

    let reaction = match reply.response_type.trim().to_ascii_uppercase().as_str() {
        "IGNORE" => CompetitorReaction::Ignore,
        "MONITOR" => CompetitorReaction::Monitor,
        "COUNTER" => CompetitorReaction::Counter,
        "AGGRESSIVE" => CompetitorReaction::Aggressive,
        other => return Err(format!("unknown competitor response {other:?}")),
    };
    check_unit_range("confidence", reply.confidence)?;
    if !reply.threat_level.is_finite() || !(1.0..=10.0).contains(&reply.threat_level) {
        return Err(format!(
            "threat_level {} outside [1, 10]",
            reply.threat_level
        ));
    }

    Ok(DecisionPayload::Competitor {
        reaction,
        threat_level: reply.threat_level.round() as u8,
        confidence: reply.confidence,
        counter_moves: reply.counter_moves,
    })
}

#[derive(Debug, Deserialize)]
struct ChannelReply {
    confidence: f64,
    metrics: ChannelMetricsReply,
}

#[derive(Debug, Deserialize)]
struct ChannelMetricsReply {
    estimated_cac: f64,
    monthly_reach: f64,
    conversion_rate: f64,
    roi_multiplier: f64,
}

pub fn parse_channel(text: &str) -> Result<DecisionPayload, String> {
    let reply: ChannelReply = parse_object(text)?;
    let m = &reply.metrics;

    check_unit_range("confidence", reply.confidence)?;
    if !m.estimated_cac.is_finite() || m.estimated_cac <= 0.0 {
        return Err(format!("estimated_cac {} must be > 0", m.estimated_cac));
    }
    check_unit_range("conversion_rate", m.conversion_rate)?;
    if !m.roi_multiplier.is_finite() || m.roi_multiplier < 0.0 {
        return Err(format!("roi_multiplier {} must be >= 0", m.roi_multiplier));
    }
    if !m.monthly_reach.is_finite() || m.monthly_reach < 0.0 {
        return Err(format!("monthly_reach {} must be >= 0", m.monthly_reach));
    }

    Ok(DecisionPayload::Channel {
        cac: m.estimated_cac,
        reach: m.monthly_reach.round() as u64,
        conversion_rate: m.conversion_rate,
        roi: m.roi_multiplier,
        confidence: reply.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let text = "Here is my answer:\n```json\n{\"decision\": \"BUY\"}\n```\nthanks";
        assert_eq!(extract_json(text), Some("{\"decision\": \"BUY\"}"));
    }

    #[test]
    fn test_extract_json_absent() {
        assert!(extract_json("no structure here").is_none());
    }

    #[test]
    fn test_parse_buyer_happy_path() {
        let text = r#"{
            "decision": "object",
            "confidence": 0.75,
            "objections": ["price too high"],
            "willingness_to_pay": {"min": 10, "max": 40, "ideal": 25},
            "perceived_value_score": 6
        }"#;
        let payload = parse_buyer(text).expect("parse");
        match payload {
            DecisionPayload::Buyer {
                verdict,
                objections,
                confidence,
                willingness_to_pay,
                perceived_value,
            } => {
                assert_eq!(verdict, BuyerVerdict::Object);
                assert_eq!(objections, vec!["price too high"]);
                assert_eq!(confidence, 0.75);
                assert_eq!(willingness_to_pay.map(|w| w.ideal), Some(25.0));
                assert_eq!(perceived_value, Some(6));
            }
            other => panic!("wrong payload: {other:?}"),
        }
    }

    #[test]
    fn test_parse_buyer_rejects_unknown_verdict() {
        let text = r#"{"decision": "MAYBE", "confidence": 0.5}"#;
        let err = parse_buyer(text).expect_err("unknown verdict");
        assert!(err.contains("MAYBE"));
    }

    #[test]
    fn test_parse_buyer_rejects_out_of_range_confidence() {
        let text = r#"{"decision": "BUY", "confidence": 1.4}"#;
        assert!(parse_buyer(text).is_err());
    }

    #[test]
    fn test_parse_buyer_rejects_inverted_wtp() {
        let text = r#"{
            "decision": "BUY",
            "confidence": 0.5,
            "willingness_to_pay": {"min": 50, "max": 20, "ideal": 30}
        }"#;
        assert!(parse_buyer(text).is_err());
    }

    #[test]
    fn test_parse_buyer_requires_confidence() {
        let text = r#"{"decision": "BUY"}"#;
        assert!(parse_buyer(text).is_err());
    }

    #[test]
    fn test_parse_competitor_happy_path() {
        let text = r#"{
            "response_type": "COUNTER",
            "confidence": 0.6,
            "threat_level": 7,
            "counter_moves": ["price drop", "feature parity"]
        }"#;
        let payload = parse_competitor(text).expect("parse");
        match payload {
            DecisionPayload::Competitor {
                reaction,
                threat_level,
                counter_moves,
                ..
            } => {
                assert_eq!(reaction, CompetitorReaction::Counter);
                assert_eq!(threat_level, 7);
                assert_eq!(counter_moves.len(), 2);
            }
            other => panic!("wrong payload: {other:?}"),
        }
    }

    #[test]
    fn test_parse_competitor_rejects_threat_out_of_range() {
        let text = r#"{"response_type": "MONITOR", "confidence": 0.5, "threat_level": 14}"#;
        assert!(parse_competitor(text).is_err());
    }

    #[test]
    fn test_parse_channel_happy_path() {
        let text = r#"{
            "confidence": 0.8,
            "metrics": {
                "estimated_cac": 42.5,
                "monthly_reach": 5000,
                "conversion_rate": 0.03,
                "roi_multiplier": 2.4
            }
        }"#;
        let payload = parse_channel(text).expect("parse");
        match payload {
            DecisionPayload::Channel {
                cac,
                reach,
                conversion_rate,
                roi,
                ..
            } => {
                assert_eq!(cac, 42.5);
                assert_eq!(reach, 5000);
                assert_eq!(conversion_rate, 0.03);
                assert_eq!(roi, 2.4);
            }
            other => panic!("wrong payload: {other:?}"),
        }
    }

    #[test]
    fn test_parse_channel_rejects_zero_cac() {
        let text = r#"{
            "confidence": 0.8,
            "metrics": {
                "estimated_cac": 0,
                "monthly_reach": 100,
                "conversion_rate": 0.03,
                "roi_multiplier": 1.0
            }
        }"#;
        let err = parse_channel(text).expect_err("zero CAC");
        assert!(err.contains("estimated_cac"));
    }

    #[test]
    fn test_parse_channel_rejects_conversion_above_one() {
        let text = r#"{
            "confidence": 0.8,
            "metrics": {
                "estimated_cac": 30,
                "monthly_reach": 100,
                "conversion_rate": 3.0,
                "roi_multiplier": 1.0
            }
        }"#;
        assert!(parse_channel(text).is_err());
    }
}
