//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存key的命名空间处理。

/// key前缀与逻辑key之间的分隔符
pub const SEPARATOR: char = '_';

/// key命名空间
///
/// 负责在逻辑key上拼接/剥离配置的前缀，是发送给后端适配器之前的
/// 唯一key变换。前缀本身不得包含分隔符，否则剥离时无法还原逻辑key。
#[derive(Clone, Debug, Default)]
pub struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    /// 创建新的命名空间
    ///
    /// # 参数
    ///
    /// * `prefix` - 缓存前缀，为空时key原样透传
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 构造带前缀的key
    pub fn build(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            return key.to_string();
        }
        format!("{}{}{}", self.prefix, SEPARATOR, key)
    }

    /// 批量构造带前缀的key
    pub fn build_all(&self, keys: &[String]) -> Vec<String> {
        keys.iter().map(|k| self.build(k)).collect()
    }

    /// 剥离前缀，还原逻辑key
    ///
    /// 按第一个分隔符切割并返回剩余部分。若key中不含分隔符则原样返回，
    /// 后端中的存量数据可能早于命名空间变更，不能因此失败整个读取。
    pub fn split(&self, namespaced: &str) -> String {
        if self.prefix.is_empty() {
            return namespaced.to_string();
        }
        match namespaced.split_once(SEPARATOR) {
            Some((_, rest)) => rest.to_string(),
            None => namespaced.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_split_round_trip() {
        let ns = KeyNamespace::new("demo");
        let built = ns.build("12344pyc-test1");
        assert_eq!(built, "demo_12344pyc-test1");
        assert_eq!(ns.split(&built), "12344pyc-test1");
    }

    #[test]
    fn empty_prefix_is_identity() {
        let ns = KeyNamespace::new("");
        assert_eq!(ns.build("user_1"), "user_1");
        assert_eq!(ns.split("user_1"), "user_1");
    }

    #[test]
    fn split_without_separator_returns_key_unmodified() {
        let ns = KeyNamespace::new("demo");
        assert_eq!(ns.split("legacykey"), "legacykey");
    }

    #[test]
    fn split_only_strips_first_separator() {
        let ns = KeyNamespace::new("demo");
        let built = ns.build("a_b_c");
        assert_eq!(ns.split(&built), "a_b_c");
    }

    #[test]
    fn build_all_maps_every_key() {
        let ns = KeyNamespace::new("p");
        let keys = vec!["k1".to_string(), "k2".to_string()];
        assert_eq!(ns.build_all(&keys), vec!["p_k1", "p_k2"]);
    }
}
