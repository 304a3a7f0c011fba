//! CLI 모듈
//!
//! persona-rag CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{build_system_prompt, create_completion, Assistant, ChatSession};
use crate::collector::{CollectionStats, FileCollector};
use crate::config::{load_env_file, Persona, Settings};
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::knowledge::{open_index, window_chunker, ChunkConfig, IndexMode, IngestOptions, Ingestor};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "persona-rag")]
#[command(version, about = "이력서 기반 페르소나 RAG 어시스턴트", long_about = None)]
pub struct Cli {
    /// 환경변수 파일
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 소스 디렉토리와 프로필 URL을 인덱스에 수집
    Ingest {
        /// 이미 수집된 문서도 다시 임베딩
        #[arg(long)]
        force: bool,

        /// 페르소나 프로필 URL 건너뛰기
        #[arg(long)]
        no_urls: bool,

        /// 첫 실패에서 중단
        #[arg(long)]
        fail_fast: bool,
    },

    /// 인덱스 검색 (응답 생성 없음)
    Query {
        /// 검색 쿼리
        query: String,

        /// 결과 개수
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// 질문 하나에 답변
    Ask {
        /// 질문
        query: String,
    },

    /// 대화형 채팅
    Chat,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    load_env_file(&cli.env_file).context("환경변수 파일 로드 실패")?;
    let settings = Settings::from_env().context("설정 로드 실패")?;

    match cli.command {
        Commands::Ingest {
            force,
            no_urls,
            fail_fast,
        } => {
            let options = IngestOptions {
                force,
                include_urls: !no_urls,
                fail_fast,
            };
            cmd_ingest(&settings, options).await
        }
        Commands::Query { query, k } => {
            cmd_query(&settings, &query, k.unwrap_or(settings.target_source_chunks)).await
        }
        Commands::Ask { query } => cmd_ask(&settings, &query).await,
        Commands::Chat => cmd_chat(&settings).await,
        Commands::Status => cmd_status(&settings).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 수집 명령어 (ingest)
///
/// 소스 디렉토리의 문서와 페르소나 프로필 URL을 청킹/임베딩하여 인덱스에 저장합니다.
async fn cmd_ingest(settings: &Settings, options: IngestOptions) -> Result<()> {
    let urls = if options.include_urls {
        load_persona(&settings.persona_file)?.profile_urls()
    } else {
        Vec::new()
    };

    let embedder = create_embedder(settings).context("임베딩 프로바이더 생성 실패")?;
    let mut index = open_index(settings, embedder.as_ref(), IndexMode::Ingest)
        .await
        .context("인덱스 열기 실패")?;

    let config = ChunkConfig::new(settings.chunk_size, settings.chunk_overlap)
        .context("잘못된 청크 설정")?;
    let ingestor = Ingestor::new(embedder, window_chunker(config)).context("수집기 생성 실패")?;

    println!("[*] 소스 디렉토리: {}", settings.source_directory.display());
    if !urls.is_empty() {
        println!("[*] 프로필 URL: {} 개", urls.len());
    }

    let report = ingestor
        .run(index.as_mut(), &settings.source_directory, &urls, options)
        .await
        .context("수집 실패")?;

    println!();
    println!(
        "[OK] 완료: 파일 {}, URL {}, 문서 {} (건너뜀 {}), 청크 {}",
        report.files, report.urls, report.documents, report.skipped_documents, report.chunks
    );

    if !report.is_clean() {
        println!("[!] 실패 {} 건:", report.failures.len());
        for failure in &report.failures {
            println!("    {}: {}", failure.source, failure.error);
        }
    }

    Ok(())
}

/// 검색 명령어 (query)
///
/// 질문과 가장 가까운 청크를 점수와 함께 출력합니다.
async fn cmd_query(settings: &Settings, query: &str, k: usize) -> Result<()> {
    println!("[*] 검색 중: \"{}\"", query);

    let embedder = create_embedder(settings).context("임베딩 프로바이더 생성 실패")?;
    let index = open_index(settings, embedder.as_ref(), IndexMode::Query)
        .await
        .context("인덱스 열기 실패")?;

    let vector = embedder.embed(query).await.context("쿼리 임베딩 실패")?;
    let hits = index.similarity_search(&vector, k).await.context("검색 실패")?;

    if hits.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", hits.len());

    for (i, hit) in hits.iter().enumerate() {
        let document = &hit.metadata.document;
        println!("{}. [점수: {:.4}] {}", i + 1, hit.score, document.source);

        if let Some(ref title) = document.title {
            println!("   제목: {}", title);
        }
        if let Some(page) = document.page {
            println!("   페이지: {}", page);
        }
        if let Some(row) = document.row {
            println!("   행: {}", row);
        }

        println!("   내용: {}", truncate_text(&hit.text, 200));
        println!();
    }

    Ok(())
}

/// 질문 명령어 (ask)
async fn cmd_ask(settings: &Settings, query: &str) -> Result<()> {
    let assistant = build_assistant(settings).await?;
    let mut session = ChatSession::new();

    answer_streaming(&assistant, &mut session, query).await?;
    Ok(())
}

/// 채팅 명령어 (chat)
///
/// 표준 입력에서 한 줄씩 질문을 읽어 답변을 스트리밍합니다.
/// 응답 실패는 해당 질문만 버리고 대화를 이어갑니다.
async fn cmd_chat(settings: &Settings) -> Result<()> {
    let assistant = build_assistant(settings).await?;
    let mut session = ChatSession::new();

    println!("[*] 질문을 입력하세요. 종료: exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        if let Err(e) = answer_streaming(&assistant, &mut session, query).await {
            println!("\n[!] {:#}", e);
        }
    }

    tracing::debug!("Chat ended after {} turns", session.len());
    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(settings: &Settings) -> Result<()> {
    println!("persona-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    match load_persona(&settings.persona_file) {
        Ok(persona) => println!("[OK] 페르소나: {} ({})", persona.name, persona.role),
        Err(e) => println!("[!] 페르소나: {:#}", e),
    }

    println!("[*] 채팅 백엔드: {}", settings.chat.backend.as_str());
    println!("[*] 임베딩 백엔드: {}", settings.embedding.backend.as_str());
    println!("[*] 인덱스 백엔드: {}", settings.index.backend.as_str());

    // 소스 디렉토리 통계
    let collector = FileCollector::with_defaults();
    match collector.collect_directory(&settings.source_directory) {
        Ok(files) => {
            let stats = CollectionStats::from_files(&files);
            println!(
                "[OK] 소스 디렉토리: {} ({} 파일, 지원 {}, PDF {}, {})",
                settings.source_directory.display(),
                stats.total_files,
                stats.supported_files,
                stats.pdf_files,
                format_bytes(stats.total_size)
            );
        }
        Err(e) => println!("[!] 소스 디렉토리: {}", e),
    }

    // 인덱스 상태
    let embedder = match create_embedder(settings) {
        Ok(embedder) => embedder,
        Err(e) => {
            println!("[!] 임베딩 프로바이더: {}", e);
            return Ok(());
        }
    };
    println!("[OK] 임베딩 모델: {} ({}차원)", embedder.model_id(), embedder.dimension());

    match open_index(settings, embedder.as_ref(), IndexMode::Query).await {
        Ok(index) => match index.count().await {
            Ok(count) => println!("[OK] {} 인덱스: {} 청크", index.name(), count),
            Err(e) => println!("[!] 인덱스 통계 조회 실패: {}", e),
        },
        Err(e) => println!("[!] 인덱스: {}", e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn load_persona(path: &Path) -> Result<Persona> {
    Persona::load(path).context("페르소나 파일 로드 실패")
}

/// 설정으로 어시스턴트 구성 (인덱스가 없으면 에러)
async fn build_assistant(settings: &Settings) -> Result<Assistant> {
    let persona = load_persona(&settings.persona_file)?;
    let embedder: Arc<dyn EmbeddingProvider> =
        create_embedder(settings).context("임베딩 프로바이더 생성 실패")?;
    let index = open_index(settings, embedder.as_ref(), IndexMode::Query)
        .await
        .context("인덱스 열기 실패 (먼저 ingest를 실행하세요)")?;
    let completion = create_completion(settings).context("채팅 프로바이더 생성 실패")?;

    Ok(Assistant::new(
        embedder,
        index,
        completion,
        build_system_prompt(&persona),
        settings.target_source_chunks,
    ))
}

/// 답변을 표준 출력으로 스트리밍
async fn answer_streaming(assistant: &Assistant, session: &mut ChatSession, query: &str) -> Result<String> {
    let mut printed = 0;
    let answer = assistant
        .answer(session, query, |buffer| {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(buffer[printed..].as_bytes());
            let _ = stdout.flush();
            printed = buffer.len();
        })
        .await
        .context("답변 생성 실패")?;

    println!();
    Ok(answer)
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================
