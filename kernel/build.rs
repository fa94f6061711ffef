//! Rux WRR 调度类构建脚本
//!
//! 这个脚本在编译前运行，负责：
//! 1. 解析 Kernel.toml 配置文件（或 menuconfig 生成的 build/.config）
//! 2. 生成 src/config.rs 配置代码

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

/// 解析 build/.config 文件（简单 key=value 格式）
fn parse_dot_config(content: &str) -> toml::Value {
    // 存储各 section 的配置
    let mut sections: HashMap<String, HashMap<String, toml::Value>> = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        // 跳过注释和空行
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // 解析 section_key=value 格式
        if let Some(eq_pos) = line.find('=') {
            let key = &line[..eq_pos];
            let value = line[eq_pos + 1..].trim().trim_matches('"');

            // 分割 section_key（使用第一个下划线分割）
            if let Some(underscore_pos) = key.find('_') {
                let section = &key[..underscore_pos];
                let config_key = &key[underscore_pos + 1..];

                // 转换值类型
                let parsed_value = if value == "true" {
                    toml::Value::Boolean(true)
                } else if value == "false" {
                    toml::Value::Boolean(false)
                } else if let Ok(int_val) = value.parse::<i64>() {
                    toml::Value::Integer(int_val)
                } else {
                    toml::Value::String(value.to_string())
                };

                sections
                    .entry(section.to_string())
                    .or_default()
                    .insert(config_key.to_string(), parsed_value);
            }
        }
    }

    let mut root_map = toml::map::Map::new();
    for (section_name, section_data) in sections {
        let mut toml_map = toml::map::Map::new();
        for (k, v) in section_data {
            toml_map.insert(k, v);
        }
        root_map.insert(section_name, toml::Value::Table(toml_map));
    }

    toml::Value::Table(root_map)
}

fn get_int(config: &toml::Value, section: &str, key: &str, default: i64) -> i64 {
    config
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_integer())
        .unwrap_or(default)
}

fn get_str<'a>(config: &'a toml::Value, section: &str, key: &str, default: &'a str) -> &'a str {
    config
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or(default)
}

fn main() {
    println!("cargo:rerun-if-changed=../Kernel.toml");
    println!("cargo:rerun-if-changed=../build/.config");

    // 优先读取 build/.config（menuconfig 生成的配置），否则回退到 Kernel.toml
    let config_content = if let Ok(content) = fs::read_to_string("../build/.config") {
        println!("cargo:warning=Using build/.config configuration");
        content
    } else if let Ok(content) = fs::read_to_string("../Kernel.toml") {
        content
    } else {
        println!("cargo:warning=Kernel.toml not found, using built-in defaults");
        String::new()
    };

    // 判断配置文件类型：检查是否有 TOML 的 [section] 格式
    let is_toml = config_content.lines().any(|line| {
        let trimmed = line.trim();
        trimmed.starts_with('[') && trimmed.ends_with(']')
    });

    let config = if is_toml {
        toml::from_str(&config_content).expect("Kernel.toml 解析失败")
    } else {
        parse_dot_config(&config_content)
    };

    let policy = get_str(&config, "scheduler", "wrr_policy", "group");
    if !matches!(policy, "basic" | "group" | "rmlfq") {
        panic!("scheduler.wrr_policy 必须是 basic / group / rmlfq 之一，当前为 {}", policy);
    }

    let fore = get_int(&config, "scheduler", "wrr_fore_timeslice", 10);
    let back = get_int(&config, "scheduler", "wrr_back_timeslice", 1);
    if fore <= 0 || back <= 0 {
        panic!("WRR 时间片必须大于 0 (fore={}, back={})", fore, back);
    }

    generate_config_code(&config, policy, fore as u32, back as u32);
}

fn generate_config_code(config: &toml::Value, policy: &str, fore: u32, back: u32) {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    let config_header = format!(
        r#"//! Rux 内核配置（自动生成）
//!
//! 此文件由 build.rs 根据 Kernel.toml 自动生成，请勿手动修改

// ============================================================
// 基本信息
// ============================================================

/// 内核名称
pub const KERNEL_NAME: &str = "{}";

/// 内核版本
pub const KERNEL_VERSION: &str = "{}";

// ============================================================
// SMP 配置
// ============================================================

/// 最大CPU数量
pub const MAX_CPUS: usize = {};

// ============================================================
// WRR 调度器配置
// ============================================================

/// 默认 WRR 调度策略 (basic / group / rmlfq)
pub const WRR_DEFAULT_POLICY: &str = "{}";

/// 前台任务时间片 (tick)
pub const WRR_FORE_TIMESLICE: u32 = {};

/// 后台任务时间片 (tick)
pub const WRR_BACK_TIMESLICE: u32 = {};

/// 每个执行单元的调度实体槽位上限
pub const WRR_MAX_ENTITIES: usize = {};

/// RMLFQ 随机数抽取范围 [0, range)
pub const WRR_RMLFQ_DRAW_RANGE: u64 = {};

/// RMLFQ 随机数种子
pub const WRR_RMLFQ_SEED: u64 = {};
"#,
        get_str(config, "general", "name", "Rux"),
        get_str(config, "general", "version", "0.1.0"),
        get_int(config, "smp", "max_cpus", 4).max(1),
        policy,
        fore,
        back,
        get_int(config, "scheduler", "wrr_max_entities", 256).max(2),
        get_int(config, "scheduler", "wrr_rmlfq_draw_range", 4294967295).max(1),
        get_int(config, "scheduler", "wrr_rmlfq_seed", 20260417).max(0),
    );

    let config_file = manifest_dir.join("src").join("config.rs");

    // 只有内容变化时才写入，避免每次编译都更新文件时间戳
    let existing_content = fs::read_to_string(&config_file).unwrap_or_default();
    if existing_content != config_header {
        fs::write(&config_file, &config_header).expect("写入配置文件失败");
    }
}
