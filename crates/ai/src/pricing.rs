const TOKENS_PER_UNIT: f64 = 1000.0;

struct ModelPrice {
    input_per_1k_usd: f64,
    output_per_1k_usd: f64,
}

// Update these constants as provider pricing changes.
fn price_for(model: &str) -> Option<ModelPrice> {
    match model {
        "gpt-3.5-turbo" => Some(ModelPrice {
            input_per_1k_usd: 0.0005,
            output_per_1k_usd: 0.0015,
        }),
        "gpt-4o-mini" => Some(ModelPrice {
            input_per_1k_usd: 0.00015,
            output_per_1k_usd: 0.0006,
        }),
        "gpt-4o" => Some(ModelPrice {
            input_per_1k_usd: 0.005,
            output_per_1k_usd: 0.015,
        }),
        _ => None,
    }
}

/// Converts reported token usage into USD; unpriced models cost nothing.
pub fn estimate_usd(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let Some(price) = price_for(model) else {
        return 0.0;
    };

    let input = (prompt_tokens as f64 / TOKENS_PER_UNIT) * price.input_per_1k_usd;
    let output = (completion_tokens as f64 / TOKENS_PER_UNIT) * price.output_per_1k_usd;
    input + output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_usage_costs_nothing() {
        assert_eq!(estimate_usd("gpt-4o", 0, 0), 0.0);
    }

    #[test]
    fn unknown_model_is_free() {
        assert_eq!(estimate_usd("llama3", 1_000_000, 1_000_000), 0.0);
    }

    #[test]
    fn gpt_4o_thousand_tokens_each_way() {
        let cost = estimate_usd("gpt-4o", 1000, 1000);
        assert!((cost - 0.020).abs() < 1e-9, "{cost}");
    }

    #[test]
    fn gpt_35_turbo_pricing() {
        let cost = estimate_usd("gpt-3.5-turbo", 2000, 1000);
        assert!((cost - 0.0025).abs() < 1e-9, "{cost}");
    }
}
