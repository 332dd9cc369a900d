use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::{AppConfig, PromptsSection};

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

pub const DEFAULT_TOPICS: &str = "topics.txt";
pub const DEFAULT_SITUATIONS: &str = "situations.txt";
pub const DEFAULT_ROLE_PLAY: &str = "role_play.json.txt";
pub const DEFAULT_DISCUSSION: &str = "discussion.json.txt";
pub const DEFAULT_EXPRESSION_PRACTICE: &str = "expression_practice.json.txt";
pub const DEFAULT_ALTERNATIVES: &str = "alternatives.txt";

/// Prompt templates, rendered with [`render_template`].
#[derive(Clone, Debug)]
pub struct PromptSet {
    pub topics: String,
    pub situations: String,
    pub role_play: String,
    pub discussion: String,
    pub expression_practice: String,
    pub alternatives: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            topics: DEFAULT_TOPICS_TEXT.to_string(),
            situations: DEFAULT_SITUATIONS_TEXT.to_string(),
            role_play: DEFAULT_ROLE_PLAY_TEXT.to_string(),
            discussion: DEFAULT_DISCUSSION_TEXT.to_string(),
            expression_practice: DEFAULT_EXPRESSION_PRACTICE_TEXT.to_string(),
            alternatives: DEFAULT_ALTERNATIVES_TEXT.to_string(),
        }
    }
}

impl PromptSet {
    /// Explicit `[prompts]` paths must exist. Otherwise a file under
    /// `prompts/` next to the config wins over the built-in text.
    pub fn load(config_path: &Path, cfg: &AppConfig) -> anyhow::Result<Self> {
        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        let p = &cfg.prompts;
        let d = Self::default();
        Ok(Self {
            topics: read_prompt(config_dir, p, "topics", DEFAULT_TOPICS, d.topics)?,
            situations: read_prompt(config_dir, p, "situations", DEFAULT_SITUATIONS, d.situations)?,
            role_play: read_prompt(config_dir, p, "role_play", DEFAULT_ROLE_PLAY, d.role_play)?,
            discussion: read_prompt(config_dir, p, "discussion", DEFAULT_DISCUSSION, d.discussion)?,
            expression_practice: read_prompt(
                config_dir,
                p,
                "expression_practice",
                DEFAULT_EXPRESSION_PRACTICE,
                d.expression_practice,
            )?,
            alternatives: read_prompt(
                config_dir,
                p,
                "alternatives",
                DEFAULT_ALTERNATIVES,
                d.alternatives,
            )?,
        })
    }
}

fn read_prompt(
    config_dir: &Path,
    p: &PromptsSection,
    key: &str,
    default_filename: &str,
    builtin: String,
) -> anyhow::Result<String> {
    let explicit = match key {
        "topics" => p.topics.clone(),
        "situations" => p.situations.clone(),
        "role_play" => p.role_play.clone(),
        "discussion" => p.discussion.clone(),
        "expression_practice" => p.expression_practice.clone(),
        "alternatives" => p.alternatives.clone(),
        other => return Err(anyhow!("unknown prompt key: {other}")),
    };

    let resolve = |s: &str| {
        let mut path = PathBuf::from(s);
        if path.is_relative() {
            path = config_dir.join(&path);
        }
        path
    };

    if let Some(s) = explicit {
        let path = resolve(&s);
        if !path.exists() {
            return Err(anyhow!(
                "prompt file not found for {key}: {} (run: material-studio init-config)",
                path.display()
            ));
        }
        return std::fs::read_to_string(&path)
            .with_context(|| format!("read prompt: {}", path.display()));
    }

    let path = resolve(&format!("{DEFAULT_PROMPTS_DIR}/{default_filename}"));
    if path.exists() {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("read prompt: {}", path.display()));
    }
    Ok(builtin)
}

pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        let pat = format!("{{{{{k}}}}}");
        out = out.replace(&pat, v);
    }
    out
}

pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (DEFAULT_TOPICS, DEFAULT_TOPICS_TEXT),
        (DEFAULT_SITUATIONS, DEFAULT_SITUATIONS_TEXT),
        (DEFAULT_ROLE_PLAY, DEFAULT_ROLE_PLAY_TEXT),
        (DEFAULT_DISCUSSION, DEFAULT_DISCUSSION_TEXT),
        (DEFAULT_EXPRESSION_PRACTICE, DEFAULT_EXPRESSION_PRACTICE_TEXT),
        (DEFAULT_ALTERNATIVES, DEFAULT_ALTERNATIVES_TEXT),
    ]
}

/// Narration guidance for recording a dialogue.
pub fn audio_script_prompt(dialogue: &str) -> String {
    format!(
        "Please create a natural-sounding audio script for the following dialogue.\n\
Include pronunciation notes for difficult words and intonation guidance:\n\n\
Dialogue:\n{dialogue}\n\n\
Please provide:\n\
1. Phonetic transcription for challenging words\n\
2. Stress and intonation patterns\n\
3. Pace and pause recommendations\n\
4. Natural pronunciation variants"
    )
}

pub fn discussion_framework_prompt(topic: &str, viewpoints: &[String]) -> String {
    let vp = viewpoints
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{}. {v}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Create a structured discussion framework for the following topic:\n\n\
Topic: {topic}\n\n\
Viewpoints to explore:\n{vp}\n\n\
Please provide:\n\
1. Opening questions to introduce each viewpoint\n\
2. Follow-up questions for deeper exploration\n\
3. Bridging phrases to connect different perspectives\n\
4. Closing questions for synthesis and conclusion\n\
5. Time allocation suggestions for each phase"
    )
}

pub fn chart_prompt(chart_types: &[String], description: &str) -> String {
    let chart_type = chart_types
        .first()
        .map(|s| s.as_str())
        .unwrap_or("bar chart");
    format!(
        "Create a {chart_type} based on the following description:\n\n\
Description: {description}\n\n\
Requirements:\n\
1. Generate realistic data that matches the description\n\
2. Include appropriate labels and title\n\
3. Use professional colors and formatting\n\
4. Ensure the chart supports the narrative described\n\
5. Include data source information if relevant\n\n\
Output format: Provide both the chart specification and the underlying data in a structured format."
    )
}

pub const DEFAULT_TOPICS_TEXT: &str = r#"あなたは語学教材作成の専門家です。以下の受講者情報に基づいて、実践的で現実的なビジネス英語の学習トピックを{{count}}個生成してください。

【受講者情報】
- 業界: {{industry}}
- 職種: {{job_role}}
- 英語レベル: {{english_level}}
- 学習目標: {{learning_goal}}
- カウンセリングメモ: {{counseling_memo}}
- 学習方針: {{teaching_policy}}
- ビジネスシーン: {{business_scenes}}

【要件】
1. 受講者が実際に遭遇する可能性が高いシーンを重視
2. 誇張された設定ではなく、日常業務で起こりうる現実的な場面
3. 指定された英語レベルに適切な難易度
4. 各トピックは簡潔に（10-15文字程度）

【出力形式】
JSON配列で{{count}}個のトピックを返してください。
例: ["クライアントとの初回面談", "商品デモンストレーション", ...]
"#;

pub const DEFAULT_SITUATIONS_TEXT: &str = r#"以下のトピックについて、具体的で実践的なシチュエーション{{count}}個を生成してください。

【トピック】: {{topic}}
【受講者情報】:
- 業界: {{industry}}
- 職種: {{job_role}}
- 英語レベル: {{english_level}}

【要件】
1. 現実的で実際に起こりうるシチュエーション
2. 受講者の業界・職種に関連性がある
3. 各シチュエーションは15-25文字程度

【出力形式】
JSON配列で{{count}}個のシチュエーションを返してください。
例: ["新規顧客への製品説明", "既存顧客からの苦情対応", "社内チームとの進捗確認"]
"#;

pub const DEFAULT_ROLE_PLAY_TEXT: &str = r#"あなたは語学教材作成の専門家です。以下の情報に基づいて、実践的なロールプレイ教材を作成してください。

【コンテキスト情報】
- 業界: {{industry}}
- 職種: {{job_role}}
- 英語レベル: {{english_level}}
- 学習目標: {{learning_goal}}

【トピック】
{{topic}}

【テンプレート設定】
- 対話長: {{dialogue_length}}
- 参加者数: {{participants}}名
- 有用表現数: {{useful_expressions_count}}個
- 追加質問数: {{additional_questions_count}}個
- 音声練習: {{audio_label}}
{{parts_instruction}}
{{sample_section}}

【カスタム指示】
{{custom_instructions}}

【要件】
1. {{dialogue_length}}程度の自然な対話
2. {{participants}}名の登場人物
3. 現実的で実践的なシチュエーション
4. 指定された英語レベルに適した表現
5. ビジネスシーンで実際に使用される表現
6. サンプルテキストのスタイルや構造を参考にする

【必要な構成要素】
- model_dialogue: モデル対話
- useful_expressions: {{useful_expressions_count}}個の有用表現（英語フレーズ: 日本語説明）
- additional_questions: {{additional_questions_count}}個の追加質問
{{audio_requirement}}

【出力形式】
以下のJSON形式で出力してください：
{
  "model_dialogue": "A: ... B: ...",
  "useful_expressions": ["I'd like to propose...: 提案したいのですが", "..."],
  "additional_questions": ["質問1", "質問2", "質問3", "質問4"]{{audio_output}}
}
"#;

pub const DEFAULT_DISCUSSION_TEXT: &str = r#"あなたは語学教材作成の専門家です。以下の情報に基づいて、実践的なディスカッション教材を作成してください。

【コンテキスト情報】
- 業界: {{industry}}
- 職種: {{job_role}}
- 英語レベル: {{english_level}}
- 学習目標: {{learning_goal}}

【トピック】
{{topic}}

【テンプレート設定】
- 複雑度: {{topic_complexity}}
- 討議時間: {{discussion_time}}
- 観点数: {{viewpoints_count}}個
- 参考資料: {{materials_label}}
- 結論: {{conclusion_label}}
{{sample_section}}

【カスタム指示】
{{custom_instructions}}

【要件】
1. {{topic_complexity}}レベルの議論テーマ
2. {{viewpoints_count}}つの異なる視点からの検討
3. {{discussion_time}}での討議に適した内容量
4. 指定された英語レベルに適した内容
5. ビジネス場面での実用性
6. サンプルテキストのスタイルや構造を参考にする

【必要な構成要素】
- discussion_topic: ディスカッショントピック
- background_info: 背景情報
- key_points: 議論のポイント（{{viewpoints_count}}つ）
- useful_expressions: 議論で使える表現（8個）
- discussion_questions: 議論を深める質問（5個）
{{materials_requirement}}

【出力形式】
以下のJSON形式で出力してください：
{
  "discussion_topic": "議論のテーマ",
  "background_info": "背景情報や説明",
  "key_points": ["ポイント1", "ポイント2", "ポイント3"],
  "useful_expressions": ["表現1: 意味", "表現2: 意味"],
  "discussion_questions": ["質問1", "質問2"]{{materials_output}}
}
"#;

pub const DEFAULT_EXPRESSION_PRACTICE_TEXT: &str = r#"あなたは語学教材作成の専門家です。以下の情報に基づいて、グラフや数値を使った表現練習教材を作成してください。

【コンテキスト情報】
- 業界: {{industry}}
- 職種: {{job_role}}
- 英語レベル: {{english_level}}
- 学習目標: {{learning_goal}}

【トピック】
{{topic}}

【テンプレート設定】
- 図表タイプ: {{chart_type}}
- 説明文長: {{explanation_length}}
- 語彙数: {{vocabulary_count}}個
- 練習問題数: {{practice_questions}}個
- 数値重視: {{numbers_label}}
{{sample_section}}

【カスタム指示】
{{custom_instructions}}

【要件】
1. 業界に関連した現実的なデータ（{{chart_type}}形式）
2. {{explanation_length}}程度の説明文
3. 指定された英語レベルに適した表現
4. 数値やトレンドの説明練習
5. サンプルテキストのスタイルや構造を参考にする

【必要な構成要素】
- chart_description: 図表の説明（{{explanation_length}}）
- chart_data: 図表データ（JSON形式）
- useful_vocabulary: 数値表現語彙（{{vocabulary_count}}個）
- practice_questions: 練習問題（{{practice_questions}}個）
- explanation_points: 説明のポイント
{{chart_prompt_requirement}}

【出力形式】
以下のJSON形式で出力してください：
{
  "chart_description": "図表の詳細説明文",
  "chart_data": {"labels": ["Q1", "Q2", "Q3", "Q4"], "values": [100, 120, 110, 140]},
  "useful_vocabulary": ["substantial increase - 大幅な増加", "decline - 減少"],
  "practice_questions": ["質問1", "質問2", "質問3"],
  "explanation_points": "説明時の重要ポイント"{{chart_prompt_output}}
}
"#;

pub const DEFAULT_ALTERNATIVES_TEXT: &str = r#"以下のビジネス英語表現と同じ意味で、異なる表現方法の代替案を{{count}}個生成してください。

【元の表現】: {{expression}}

【要件】:
1. 同じ意味・ニュアンスを保つ
2. ビジネス場面で適切
3. 自然な英語表現
4. 各代替案は異なる単語・構造を使用

【出力形式】:
JSON配列で{{count}}個の代替表現を返してください。
例: ["alternative 1", "alternative 2", "alternative 3"]
"#;
