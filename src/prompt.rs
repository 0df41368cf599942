// Prompt framing and the static catalogue shown around the question box

use ratatui::style::Color;

#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub color: Color,
}

pub const CATEGORIES: [Category; 6] = [
    Category { icon: "🌱", title: "Crop Planning", description: "Seasonal crop selection and rotation strategies", color: Color::Green },
    Category { icon: "☀", title: "Growth Management", description: "Optimize your crop's growth cycle", color: Color::Yellow },
    Category { icon: "💧", title: "Irrigation Tips", description: "Smart water management practices", color: Color::Blue },
    Category { icon: "🌬", title: "Pest Control", description: "Natural and chemical pest management", color: Color::Gray },
    Category { icon: "🌡", title: "Weather Insights", description: "Climate-smart farming decisions", color: Color::LightRed },
    Category { icon: "💲", title: "Market Updates", description: "Current prices and market trends", color: Color::Green },
];

pub const SUGGESTIONS: [&str; 5] = [
    "What crops are best suited for the current season?",
    "How to manage water during drought conditions?",
    "Natural methods to control common crop pests",
    "Best practices for organic fertilization",
    "When is the optimal time to harvest?",
];

pub fn suggestion(index: usize) -> Option<&'static str> {
    SUGGESTIONS.get(index).copied()
}

pub fn frame_advice_prompt(query: &str) -> String {
    format!(
        "As an agricultural expert, provide detailed advice on the following query.\n\
         Consider these aspects in your response:\n\
         - Local farming conditions and seasonal factors\n\
         - Sustainable farming practices\n\
         - Cost-effective solutions\n\
         - Traditional and modern farming techniques\n\
         - Risk management\n\
         - Resource optimization\n\
         \n\
         Query: {}\n\
         \n\
         Please structure your response with clear sections and actionable steps.",
        query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_query_between_aspects_and_closing() {
        let framed = frame_advice_prompt("When to sow maize?");
        let query_at = framed.find("Query: When to sow maize?").unwrap();
        assert!(framed.find("Resource optimization").unwrap() < query_at);
        assert!(framed.find("actionable steps").unwrap() > query_at);
        assert!(framed.starts_with("As an agricultural expert"));
    }

    #[test]
    fn suggestions_are_indexed() {
        assert_eq!(suggestion(0), Some("What crops are best suited for the current season?"));
        assert_eq!(suggestion(SUGGESTIONS.len()), None);
    }
}
