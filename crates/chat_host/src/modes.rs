//! Model and tool selection for a chat turn.

use shared::agent_api::{ChatModelConfig, ChatTool};
use shared::chat::{ChatModeConfig, GeoLocation};
use shared::settings::ModelSet;

/// Pick the model, reasoning budget and tools for a text turn.
///
/// Toggles are applied in a fixed order: thinking, search, maps. Each later
/// toggle replaces the model chosen before it, so thinking combined with search
/// or maps runs on the mid-tier model without the reasoning budget. Tools
/// accumulate regardless of which model wins.
pub fn select_chat_config(mode: &ChatModeConfig, models: &ModelSet) -> ChatModelConfig {
    let mut config = ChatModelConfig {
        model: models.lite_model.clone(),
        thinking_budget: None,
        tools: Vec::new(),
        location: None,
    };

    if mode.use_thinking {
        config.model = models.pro_model.clone();
        config.thinking_budget = Some(models.thinking_budget);
    }
    if mode.use_search {
        use_mid_tier(&mut config, models);
        config.tools.push(ChatTool::WebSearch);
    }
    if mode.use_maps {
        use_mid_tier(&mut config, models);
        config.tools.push(ChatTool::Maps);
        config.location = mode.location.filter(has_coordinates);
    }
    config
}

fn use_mid_tier(config: &mut ChatModelConfig, models: &ModelSet) {
    config.model = models.mid_model.clone();
    config.thinking_budget = None;
}

/// Zero coordinates count as "no location", matching the browser geolocation
/// fallback.
fn has_coordinates(location: &GeoLocation) -> bool {
    location.latitude != 0.0 && location.longitude != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(thinking: bool, search: bool, maps: bool) -> ChatModeConfig {
        ChatModeConfig {
            use_thinking: thinking,
            use_search: search,
            use_maps: maps,
            location: None,
        }
    }

    #[test]
    fn test_default_is_lite_without_tools() {
        let config = select_chat_config(&mode(false, false, false), &ModelSet::default());
        assert_eq!(config.model, "gemini-2.5-flash-lite");
        assert!(config.tools.is_empty());
        assert_eq!(config.thinking_budget, None);
    }

    #[test]
    fn test_thinking_selects_pro_with_budget() {
        let config = select_chat_config(&mode(true, false, false), &ModelSet::default());
        assert_eq!(config.model, "gemini-2.5-pro");
        assert!(config.thinking_budget.unwrap() > 0);
        assert!(config.tools.is_empty());
    }

    #[test]
    fn test_search_selects_mid_with_one_tool() {
        let config = select_chat_config(&mode(false, true, false), &ModelSet::default());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.tools, vec![ChatTool::WebSearch]);
    }

    #[test]
    fn test_search_and_maps_attach_both_tools_in_order() {
        let config = select_chat_config(&mode(false, true, true), &ModelSet::default());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.tools, vec![ChatTool::WebSearch, ChatTool::Maps]);
        let names: Vec<_> = config.tools.iter().map(ChatTool::as_str).collect();
        assert_eq!(names, vec!["web-search", "maps"]);
    }

    // Known quirk: a later toggle overrides thinking, so the reasoning model
    // and its budget are lost when search is also on.
    #[test]
    fn test_search_overrides_thinking() {
        let config = select_chat_config(&mode(true, true, false), &ModelSet::default());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.thinking_budget, None);
        assert_eq!(config.tools, vec![ChatTool::WebSearch]);
    }

    #[test]
    fn test_maps_overrides_thinking() {
        let config = select_chat_config(&mode(true, false, true), &ModelSet::default());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.thinking_budget, None);
        assert_eq!(config.tools, vec![ChatTool::Maps]);
    }

    #[test]
    fn test_maps_attaches_location_when_known() {
        let mut m = mode(false, false, true);
        m.location = Some(GeoLocation {
            latitude: 45.52,
            longitude: -122.68,
        });
        let config = select_chat_config(&m, &ModelSet::default());
        assert_eq!(config.location, m.location);
    }

    #[test]
    fn test_location_ignored_without_maps() {
        let mut m = mode(false, true, false);
        m.location = Some(GeoLocation {
            latitude: 45.52,
            longitude: -122.68,
        });
        assert_eq!(select_chat_config(&m, &ModelSet::default()).location, None);
    }

    #[test]
    fn test_zero_coordinates_are_dropped() {
        let mut m = mode(false, false, true);
        m.location = Some(GeoLocation {
            latitude: 0.0,
            longitude: 12.0,
        });
        assert_eq!(select_chat_config(&m, &ModelSet::default()).location, None);
    }
}
