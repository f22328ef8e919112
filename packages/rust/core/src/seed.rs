//! The built-in soil-advice rule set.
//!
//! Used as the `builtin` source and written out by `seed`, `kb export`, and
//! the `setup-database` endpoint. Specific questions come before the broad
//! topic rules so they win on priority.

use soilscope_shared::RuleDescriptor;

fn rule(pattern: &str, reply: &str, category: &str, level: &str, keywords: &[&str]) -> RuleDescriptor {
    RuleDescriptor {
        question_pattern: pattern.into(),
        reply_text: reply.into(),
        category: category.into(),
        level: level.into(),
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
    }
}

/// The built-in rules in priority order.
pub fn builtin_rules() -> Vec<RuleDescriptor> {
    vec![
        rule(
            r"\b(hello|hi|hey|namaste|hola)\b|good (morning|afternoon|evening)|^(start|begin)\b",
            "Hi! I'm your SoilScope assistant. Ask me about soil health, pH, moisture, crops, \
             fertilizers, or farming techniques. How can I help you today?",
            "Greetings",
            "basic",
            &["greeting", "hello", "start"],
        ),
        rule(
            r"what.*ph.*ideal|ideal.*ph.*level",
            "The ideal pH level for most crops is between 6.0-7.0. This range ensures optimal \
             nutrient availability and root health.",
            "pH Management",
            "basic",
            &["ph", "ideal"],
        ),
        rule(
            r"how.*improve.*soil.*fertility",
            "To improve soil fertility: 1) Add organic compost, 2) Use cover crops, 3) Rotate crops \
             annually, 4) Test soil regularly, 5) Apply balanced fertilizers based on soil test results.",
            "Soil Health",
            "intermediate",
            &["fertility", "compost", "cover crops", "rotation"],
        ),
        rule(
            r"best.*crops?.*clay.*soil",
            "Clay soils work well for: rice, wheat, soybeans, and root vegetables like carrots and \
             beets. These crops can handle the dense, moisture-retentive nature of clay soil.",
            "Crop Selection",
            "intermediate",
            &["clay", "crops", "rice", "wheat"],
        ),
        rule(
            r"how.*test.*ph|ph.*test|measure.*ph",
            "Test soil pH using: 1) Digital pH meter (most accurate), 2) pH test strips, 3) Home \
             test kits, or 4) Professional lab testing. Test in spring before planting for best results.",
            "pH Management",
            "intermediate",
            &["ph", "test", "measure", "meter", "strips"],
        ),
        rule(
            r"ph.*range|ph level|soil ph|acidity|alkaline|acid.*soil",
            "Most crops thrive in soil pH 6.0–7.0. Acidic soils (<6.0) can limit nutrient uptake; \
             add lime to raise pH. For alkaline soils (>7.5), add sulfur or organic matter to lower pH.",
            "pH Management",
            "basic",
            &["ph", "acidity", "alkaline", "lime", "sulfur"],
        ),
        rule(
            r"moisture|irrigation|water(ing)?|dry soil|wet soil|drought",
            "Aim for 35–60% soil moisture depending on crop and growth stage. Water early morning \
             to reduce evaporation, use mulch to retain moisture, and ensure proper drainage to \
             avoid waterlogging.",
            "Water Management",
            "basic",
            &["moisture", "irrigation", "watering", "drought", "mulch"],
        ),
        rule(
            r"nitrogen|phosphorus|potassium|npk|fertili[sz]er|nutrients",
            "Balanced NPK fertilizer depends on your soil test results. Common ratios: 10-10-10 for \
             general use, 10-26-26 for root crops, 20-10-10 for leafy greens. Always test your soil \
             first for best results.",
            "Fertilizers",
            "basic",
            &["npk", "nitrogen", "phosphorus", "potassium", "fertilizer"],
        ),
        rule(
            r"crops? recommendation|what to plant|which crop|best crop",
            "Crop selection depends on your soil type, climate, and season. For neutral pH \
             (6.0-7.0): corn, wheat, soybeans, tomatoes. For acidic soil: potatoes, blueberries, \
             azaleas. For clay soil: rice, wheat, cabbage.",
            "Crop Selection",
            "basic",
            &["crops", "plant", "selection", "recommendation"],
        ),
        rule(
            r"corn|maize",
            "Corn grows best in well-drained soil with pH 6.0-6.8, requires high nitrogen (150-200 \
             lbs/acre), and needs consistent moisture (1-1.5 inches/week). Plant after soil \
             temperature reaches 60°F (15°C).",
            "Specific Crops",
            "intermediate",
            &["corn", "maize", "nitrogen", "temperature"],
        ),
        rule(
            r"tomato(es)?",
            "Tomatoes prefer slightly acidic soil (pH 6.0-6.8), need consistent watering (1-2 \
             inches/week), and benefit from calcium to prevent blossom end rot. Use stakes or cages \
             for support. Mulch to retain moisture.",
            "Specific Crops",
            "intermediate",
            &["tomato", "calcium", "blossom end rot", "support"],
        ),
        rule(
            r"wheat",
            "Wheat thrives in well-drained soil with pH 6.0-7.0, requires moderate nitrogen (80-120 \
             lbs/acre), and is typically planted in fall for spring harvest in temperate climates. \
             Needs good air circulation.",
            "Specific Crops",
            "intermediate",
            &["wheat", "fall planting", "nitrogen", "circulation"],
        ),
        rule(
            r"potato(es)?",
            "Potatoes prefer slightly acidic soil (pH 5.8-6.2), need loose, well-drained soil, and \
             benefit from hilling to prevent green tubers. Avoid fresh manure which can cause scab \
             disease.",
            "Specific Crops",
            "intermediate",
            &["potato", "acidic", "hilling", "scab disease"],
        ),
        rule(
            r"compost|organic|manure",
            "Add 2–5 kg/m² of well-decomposed compost annually. It improves soil structure, \
             increases water retention, feeds beneficial microbes, and provides slow-release \
             nutrients. Turn compost every 2-3 weeks.",
            "Soil Health",
            "basic",
            &["compost", "organic matter", "microbes", "structure"],
        ),
        rule(
            r"soil test|testing|analysis",
            "Test your soil every 2-3 years for pH, NPK levels, and organic matter. Spring is ideal \
             for testing. Use our SoilScope image analysis or get a professional lab test for \
             detailed results including micronutrients.",
            "Soil Testing",
            "basic",
            &["soil test", "analysis", "lab", "micronutrients"],
        ),
        rule(
            r"pest|disease|bug|insect|fung(us|al|i)",
            "Healthy soil supports plants' natural pest resistance. Use crop rotation, beneficial \
             insects, companion planting, and organic treatments. Avoid overwatering which can \
             promote fungal diseases.",
            "Pest Management",
            "basic",
            &["pest", "disease", "rotation", "beneficial insects"],
        ),
    ]
}
