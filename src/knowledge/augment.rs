//! 쿼리 증강 - 검색된 청크를 질문 앞에 붙입니다.

/// 검색 결과 블록 시작 구분자
pub const SEARCH_RESULTS_START: &str = "###Search Results: \n";
/// 검색 결과 블록 끝 구분자
pub const SEARCH_RESULTS_END: &str = " #End of Search Results\n\n-----\n\n ";

/// 컨텍스트(검색 순위 순)를 이어 붙여 구분자로 감싼 뒤 질문을 덧붙임
///
/// 중복 제거 없음. 컨텍스트가 비어 있어도 에러가 아닙니다.
pub fn augment_query<S: AsRef<str>>(contexts: &[S], query: &str) -> String {
    let context_len: usize = contexts.iter().map(|c| c.as_ref().len()).sum();
    let mut out = String::with_capacity(
        SEARCH_RESULTS_START.len() + context_len + SEARCH_RESULTS_END.len() + query.len(),
    );

    out.push_str(SEARCH_RESULTS_START);
    for context in contexts {
        out.push_str(context.as_ref());
    }
    out.push_str(SEARCH_RESULTS_END);
    out.push_str(query);
    out
}
