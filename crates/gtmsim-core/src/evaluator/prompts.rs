//! Role prompt builders.
//!
//! Each builder returns a (system, user) pair: the system prompt frames the
//! role-played persona, the user prompt carries this cycle's pitch context
//! and the reply schema the parser expects.

use crate::domain::config::{ChannelConfig, CompetitorConfig, PersonaConfig, SimConfig};

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none listed)".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pricing_block(config: &SimConfig) -> String {
    let tiers = config
        .pricing
        .tiers
        .iter()
        .map(|t| format!("- {}: ${:.0}/mo", t.name, t.price))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Model: {}\n{}",
        config.pricing.model,
        if tiers.is_empty() {
            "Pricing not specified".to_string()
        } else {
            tiers
        }
    )
}

fn product_block(config: &SimConfig) -> String {
    format!(
        "**{}**\n\n{}\n\nValue proposition: {}\n\nKey features:\n{}",
        config.product.name,
        config.product.description,
        config.product.unique_value_prop,
        bullet_list(&config.product.key_features),
    )
}

pub fn buyer(config: &SimConfig, persona: &PersonaConfig, cycle: u32) -> (String, String) {
    let system = format!(
        "You are role-playing a potential buyer evaluating a product pitch.\n\n\
## Your Persona: {name}\n\
- Role: {role}\n\
- Company size: {size}\n\
- Budget range: {budget}\n\n\
## Your Pain Points\n{pains}\n\n\
## Your Goals\n{goals}\n\n\
## Your Typical Objections\n{objections}\n\n\
Evaluate realistically and critically; not every product fits every buyer.\n\
Always reply with a single JSON object and nothing else.",
        name = persona.name,
        role = persona.role,
        size = persona.company_size,
        budget = persona.budget_range,
        pains = bullet_list(&persona.pain_points),
        goals = bullet_list(&persona.goals),
        objections = bullet_list(&persona.objection_tendencies),
    );

    let user = format!(
        "## Evaluation Round {cycle}\n\n\
## Product Being Pitched\n{product}\n\n\
## Pricing\n{pricing}\n\n\
## Your Decision\n\
Decide whether you would BUY (solves my problem at an acceptable price),\n\
PASS (not interested), or OBJECT (interested but with concerns).\n\n\
Reply with JSON:\n\
{{\n\
  \"decision\": \"BUY\" | \"PASS\" | \"OBJECT\",\n\
  \"confidence\": 0.0-1.0,\n\
  \"objections\": [\"...\"],\n\
  \"willingness_to_pay\": {{\"min\": <number>, \"max\": <number>, \"ideal\": <number>}},\n\
  \"perceived_value_score\": 1-10\n\
}}",
        cycle = cycle + 1,
        product = product_block(config),
        pricing = pricing_block(config),
    );

    (system, user)
}

pub fn competitor(config: &SimConfig, profile: &CompetitorConfig, cycle: u32) -> (String, String) {
    let system = format!(
        "You are role-playing the competitive strategy team at {name}.\n\n\
- Market position: {positioning}\n\
- Pricing strategy: {pricing}\n\
- Market share: {share}\n\n\
## Strengths\n{strengths}\n\n\
## Weaknesses\n{weaknesses}\n\n\
A new entrant is arriving in your market. Predict your company's realistic\n\
response; big incumbents often ignore small entrants until they reach scale.\n\
Always reply with a single JSON object and nothing else.",
        name = profile.name,
        positioning = profile.positioning,
        pricing = profile.pricing,
        share = profile.market_share,
        strengths = bullet_list(&profile.strengths),
        weaknesses = bullet_list(&profile.weaknesses),
    );

    let user = format!(
        "## Evaluation Round {cycle}\n\n\
## New Market Entrant\n{product}\n\n\
## Their Pricing\n{pricing}\n\n\
## Your Competitive Response\n\
Reply with JSON:\n\
{{\n\
  \"response_type\": \"IGNORE\" | \"MONITOR\" | \"COUNTER\" | \"AGGRESSIVE\",\n\
  \"confidence\": 0.0-1.0,\n\
  \"threat_level\": 1-10,\n\
  \"counter_moves\": [\"...\"]\n\
}}",
        cycle = cycle + 1,
        product = product_block(config),
        pricing = pricing_block(config),
    );

    (system, user)
}

pub fn channel(config: &SimConfig, profile: &ChannelConfig, cycle: u32) -> (String, String) {
    let system = format!(
        "You are an expert in the {name} acquisition channel, projecting how it\n\
would perform for a specific product.\n\n\
- Priority level: {priority}/5\n\
- Budget allocation: {budget}%\n\
- Current presence: {presence}\n\n\
## Strategy Notes\n{notes}\n\n\
Be realistic about reach, acquisition cost, and saturation; early results\n\
often differ from scaled results.\n\
Always reply with a single JSON object and nothing else.",
        name = profile.name,
        priority = profile.priority,
        budget = profile.budget_allocation,
        presence = profile.existing_presence,
        notes = if profile.strategy_notes.is_empty() {
            "(none)"
        } else {
            &profile.strategy_notes
        },
    );

    let user = format!(
        "## Evaluation Round {cycle}\n\n\
## Product Context\n{product}\n\n\
## Pricing\n{pricing}\n\n\
## Channel Performance Projection\n\
Project how the {name} channel performs for this product.\n\n\
Reply with JSON:\n\
{{\n\
  \"confidence\": 0.0-1.0,\n\
  \"metrics\": {{\n\
    \"estimated_cac\": <dollars, > 0>,\n\
    \"monthly_reach\": <potential customers>,\n\
    \"conversion_rate\": <decimal in [0,1]>,\n\
    \"roi_multiplier\": <return on spend, >= 0>\n\
  }}\n\
}}",
        cycle = cycle + 1,
        product = product_block(config),
        pricing = pricing_block(config),
        name = profile.name,
    );

    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::minimal_config;

    #[test]
    fn test_buyer_prompt_mentions_persona_and_product() {
        let config = minimal_config();
        let (system, user) = buyer(&config, &config.personas[0], 0);
        assert!(system.contains("Founder"));
        assert!(system.contains("JSON"));
        assert!(user.contains("Widget"));
        assert!(user.contains("Evaluation Round 1"));
    }

    #[test]
    fn test_channel_prompt_names_channel() {
        let config = minimal_config();
        let (system, user) = channel(&config, &config.channels[0], 2);
        assert!(system.contains("organic-social"));
        assert!(user.contains("estimated_cac"));
        assert!(user.contains("Evaluation Round 3"));
    }

    #[test]
    fn test_bullet_list_empty_placeholder() {
        assert_eq!(bullet_list(&[]), "- (none listed)");
        assert_eq!(
            bullet_list(&["a".to_string(), "b".to_string()]),
            "- a\n- b"
        );
    }
}
