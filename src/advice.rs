use regex::Regex;
use serde::Serialize;

use crate::{error::Result, risk::AgeGroup};

/// Turns AI advice text into display lines.
///
/// Markdown bold markers are dropped and every `○` bullet that does not
/// already start a sentence or a line is moved onto its own line.
pub struct AdviceFormatter {
    bullet_regex: Regex,
}

impl AdviceFormatter {
    pub fn new() -> Result<Self> {
        let bullet_regex = Regex::new("([^。\n])○")?;
        Ok(Self { bullet_regex })
    }

    pub fn format(&self, message: &str) -> Vec<String> {
        let cleaned = message.replace("**", "");
        let broken = self.bullet_regex.replace_all(&cleaned, "${1}\n○");

        broken
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }
}

pub fn format_ai_message(message: &str) -> Result<Vec<String>> {
    Ok(AdviceFormatter::new()?.format(message))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuidanceItem {
    pub title: &'static str,
    pub lines: [&'static str; 3],
}

/// Fixed precautions shown for an age bracket regardless of the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeGuidance {
    pub title: &'static str,
    pub items: [GuidanceItem; 3],
}

const INFANT_GUIDANCE: AgeGuidance = AgeGuidance {
    title: "0-1歳（乳児）基本注意点",
    items: [
        GuidanceItem {
            title: "水分補給",
            lines: [
                "体調について話せないため、保護者による頻繁な水分補給",
                "授乳・ミルクの回数を増やす",
                "母乳育児の場合はお母さんも水分補給を",
            ],
        },
        GuidanceItem {
            title: "観察のポイント",
            lines: [
                "顔色・呼吸・泣き声の変化を頻繁にチェック",
                "普段より静かになったり、ぐったりしていないか",
                "汗の量や体温の変化に注意",
            ],
        },
        GuidanceItem {
            title: "避けるべきこと",
            lines: [
                "車内や密閉空間に放置しない",
                "直射日光や高温環境は避ける",
                "厚着や重ね着をさせない",
            ],
        },
    ],
};

const TODDLER_GUIDANCE: AgeGuidance = AgeGuidance {
    title: "2-3歳（幼児）基本注意点",
    items: [
        GuidanceItem {
            title: "水分補給",
            lines: [
                "体調の前兆が分からないため、定期的な声かけ",
                "好きな飲み物で楽しく水分補給",
                "ストローマグなど飲みやすい容器を使用",
            ],
        },
        GuidanceItem {
            title: "観察のポイント",
            lines: [
                "元気さや機嫌の変化をチェック",
                "汗の量や顔色の変化に注意",
                "普段と違う様子がないか確認",
            ],
        },
        GuidanceItem {
            title: "環境への配慮",
            lines: [
                "帽子着用を習慣づける",
                "こまめな着替えを準備",
                "日陰での活動を心がける",
            ],
        },
    ],
};

const PRESCHOOLER_GUIDANCE: AgeGuidance = AgeGuidance {
    title: "4-6歳（園児）基本注意点",
    items: [
        GuidanceItem {
            title: "水分補給",
            lines: [
                "自分でも体調を伝えられるが、忘れがちなので声かけ",
                "「のどが渇いた」と感じる前の補給",
                "薄めた飲み物で適切な塩分も補給",
            ],
        },
        GuidanceItem {
            title: "コミュニケーション",
            lines: [
                "体調の変化を大人に伝える練習",
                "「頭が痛い」「気分が悪い」を言えるように",
                "「今日は元気？」の定期的な確認",
            ],
        },
        GuidanceItem {
            title: "活動の工夫",
            lines: [
                "遊びと休憩のバランスを取る",
                "涼しい時間帯の活動を選ぶ",
                "水遊びなど体温調節できる遊びを取り入れる",
            ],
        },
    ],
};

pub fn guidance_for(age_group: AgeGroup) -> &'static AgeGuidance {
    match age_group {
        AgeGroup::Infant => &INFANT_GUIDANCE,
        AgeGroup::Toddler => &TODDLER_GUIDANCE,
        AgeGroup::Preschooler => &PRESCHOOLER_GUIDANCE,
    }
}

/// Unrecognized labels get the 2-3 guidance
pub fn guidance_for_label(label: &str) -> &'static AgeGuidance {
    guidance_for(AgeGroup::from_label_or_default(label))
}
