//! User-facing replies.
//!
//! A [`Card`] is the platform-neutral shape of a chat embed. It renders to
//! plain text for the terminal and to a Discord embed object for direct
//! messages.
use crate::lookup::{LookupFailure, LookupOutcome, ViolationReport};
use crate::plate::Plate;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardColor {
    Blue,
    Green,
}

impl CardColor {
    pub fn rgb(self) -> u32 {
        match self {
            CardColor::Blue => 0x3498db,
            CardColor::Green => 0x2ecc71,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub title: String,
    pub description: Option<String>,
    pub color: CardColor,
    pub fields: Vec<CardField>,
}

impl Card {
    pub fn new(title: impl Into<String>, color: CardColor) -> Self {
        Self {
            title: title.into(),
            description: None,
            color,
            fields: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(CardField {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        if let Some(description) = &self.description {
            out.push_str(description);
            out.push('\n');
        }
        for field in &self.fields {
            out.push('\n');
            out.push_str(&field.name);
            out.push('\n');
            for line in field.value.lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    pub fn to_discord_embed(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|field| json!({"name": field.name, "value": field.value, "inline": false}))
            .collect();
        let mut embed = json!({
            "title": self.title,
            "color": self.color.rgb(),
            "fields": fields,
        });
        if let Some(description) = &self.description {
            embed["description"] = Value::String(description.clone());
        }
        embed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// Ephemeral replies are only shown to the requesting user.
    Text { content: String, ephemeral: bool },
    Card(Card),
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Reply::Text {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Reply::Text {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Reply::Text { content, .. } => format!("{content}\n"),
            Reply::Card(card) => card.to_text(),
        }
    }
}

pub fn report_card(report: &ViolationReport) -> Card {
    let mut card = Card::new(
        format!("🚗 Kết quả kiểm tra biển số {}", report.plate),
        CardColor::Blue,
    );
    for violation in &report.violations {
        let marker = if violation.unresolved { "🟥" } else { "🟩" };
        card.push_field(
            "Thông tin vi phạm",
            format!(
                "🔹 Loại xe: {}\n⏰ Thời gian: {}\n📍 Địa điểm: {}\n⚠️ Vi phạm: {}\n{} Trạng thái: {}",
                violation.vehicle_type,
                violation.time,
                violation.location,
                violation.behavior,
                marker,
                violation.status
            ),
        );
    }
    card
}

pub fn outcome_reply(outcome: &LookupOutcome) -> Reply {
    match outcome {
        LookupOutcome::Report(report) => Reply::Card(report_card(report)),
        LookupOutcome::Clean { plate } => {
            Reply::public(format!("✅ Biển số {plate} chưa phát hiện vi phạm."))
        }
        LookupOutcome::Failed { failure, .. } => match failure {
            LookupFailure::Api(text) => Reply::public(format!("❌ {text}")),
            LookupFailure::Transport(text) => Reply::public(format!("⚠️ Lỗi: {text}")),
        },
    }
}

pub fn invalid_format() -> Reply {
    Reply::ephemeral("⚠️ Biển số không đúng định dạng!")
}

pub fn registered(plate: &Plate) -> Reply {
    Reply::Card(
        Card::new("✅ Đăng ký thành công", CardColor::Green)
            .with_description(format!("Đã đăng ký biển số {plate}")),
    )
}

pub fn already_registered(plate: &Plate) -> Reply {
    Reply::ephemeral(format!("ℹ️ Bạn đã đăng ký biển số {plate} trước đó."))
}

pub fn limit_reached(max: usize) -> Reply {
    Reply::ephemeral(format!("⚠️ Bạn đã đăng ký tối đa {max} biển số!"))
}

pub fn owned_by_other(plate: &Plate) -> Reply {
    Reply::ephemeral(format!("❌ Biển số {plate} đã được người khác đăng ký!"))
}

pub fn plate_list(plates: &[Plate], max: usize) -> Reply {
    if plates.is_empty() {
        return Reply::ephemeral("❌ Bạn chưa đăng ký biển số nào!");
    }
    let mut card = Card::new("📋 Danh sách biển số đã đăng ký", CardColor::Blue)
        .with_description(format!("Số lượng: {}/{}", plates.len(), max));
    for plate in plates {
        card.push_field("🚗 Biển số", plate.to_string());
    }
    Reply::Card(card)
}

pub fn removed(plate: &Plate) -> Reply {
    Reply::Card(
        Card::new("✅ Xóa thành công", CardColor::Green)
            .with_description(format!("Đã xóa biển số {plate}")),
    )
}

pub fn not_found_or_not_owner() -> Reply {
    Reply::ephemeral("❌ Biển số không tồn tại hoặc không thuộc về bạn!")
}
