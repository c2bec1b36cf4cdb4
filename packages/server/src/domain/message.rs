//! チャットメッセージ関連の値オブジェクトとエンティティ
//!
//! - `MessageBody`: バリデーションとサニタイズ済みの本文
//! - `ChatMessage`: ルーム履歴・ブロードキャスト・永続化の単位（不変）

use serde::Serialize;

use super::{DomainError, RoomName};

/// HTML 描画クライアントへのインジェクションを防ぐため、
/// マークアップに使われる文字をエスケープする。
///
/// `&` を最初に置換しないと後続のエスケープ結果が二重に壊れる。
pub fn escape_markup(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// チャットメッセージ本文（値オブジェクト）
///
/// 生成時に trim・空チェック・長さ上限チェック・サニタイズを行うため、
/// この型の値は常に配信可能な状態です。文字数上限は trim 後の
/// 生テキストに対して適用されます（エスケープによる増加は数えない）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageBody(String);

impl MessageBody {
    /// 生テキストから本文を生成
    pub fn new(raw: &str, max_chars: usize) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyMessage);
        }
        let chars = trimmed.chars().count();
        if chars > max_chars {
            return Err(DomainError::MessageTooLong {
                chars,
                max: max_chars,
            });
        }
        Ok(Self(escape_markup(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// チャットメッセージ（エンティティ、生成後は不変）
///
/// `id` はルームごとの単調増加カウンタで採番されるため、
/// 同一ルームの履歴内で一意です。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub room_name: RoomName,
    /// ゲスト発言の場合は None
    pub author_user_id: Option<i64>,
    pub author_display_name: String,
    pub body: MessageBody,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markup_escapes_html_significant_characters() {
        // テスト項目: マークアップに使われる文字がすべてエスケープされる
        // given (前提条件):
        let raw = r#"<script>alert("x&y")</script>'"#;

        // when (操作):
        let escaped = escape_markup(raw);

        // then (期待する結果):
        assert_eq!(
            escaped,
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;&#39;"
        );
    }

    #[test]
    fn test_message_body_trims_and_sanitizes() {
        // テスト項目: 本文が trim され、サニタイズされる
        // given (前提条件):
        let raw = "  hello <world>  ";

        // when (操作):
        let body = MessageBody::new(raw, 500).unwrap();

        // then (期待する結果):
        assert_eq!(body.as_str(), "hello &lt;world&gt;");
    }

    #[test]
    fn test_message_body_rejects_empty_after_trim() {
        // テスト項目: trim 後に空となる本文が拒否される
        // given (前提条件):
        let raw = "   \t  ";

        // when (操作):
        let result = MessageBody::new(raw, 500);

        // then (期待する結果):
        assert_eq!(result, Err(DomainError::EmptyMessage));
    }

    #[test]
    fn test_message_body_rejects_oversized_text() {
        // テスト項目: 文字数上限を超える本文が拒否される
        // given (前提条件):
        let raw = "a".repeat(501);

        // when (操作):
        let result = MessageBody::new(&raw, 500);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(DomainError::MessageTooLong {
                chars: 501,
                max: 500
            })
        );
    }

    #[test]
    fn test_message_body_length_counts_raw_chars_not_escaped() {
        // テスト項目: 文字数上限はエスケープ前のテキストで判定される
        // given (前提条件): エスケープすると 5 文字 x 5 倍に膨らむ本文
        let raw = "<".repeat(5);

        // when (操作):
        let result = MessageBody::new(&raw, 5);

        // then (期待する結果): 生テキストは 5 文字なので受理される
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "&lt;".repeat(5));
    }
}
