//! 按键映射：将原始按键代码转换为游戏输入
//!
//! 负责维护配置的键位映射关系，并将原始输入事件转换为游戏逻辑输入。
//! 只有按下事件会产生输入，释放事件被丢弃。

use std::collections::HashMap;

use tracing::warn;

use crate::config::Keys;
use crate::lane::Lane;
use crate::loops::{InputMsg, KeyState, RawInputMsg, RawKeyCode};

/// 按键映射器
pub struct KeyMap {
    /// 按键代码字符串到游戏输入的映射
    map: HashMap<String, InputMsg>,
}

impl KeyMap {
    /// 从键位配置创建映射器
    ///
    /// 多个动作绑定到同一按键时，先出现的绑定生效（顺序：A 轨、D 轨、重新开始、暂停）。
    #[must_use]
    pub fn new(keys: &Keys) -> Self {
        let bindings = [
            (&keys.lane_a, InputMsg::KeyDown(Lane::A)),
            (&keys.lane_d, InputMsg::KeyDown(Lane::D)),
            (&keys.restart, InputMsg::Restart),
            (&keys.pause, InputMsg::TogglePause),
        ];
        let mut map = HashMap::new();
        for (code, msg) in bindings {
            if let Some(prev) = map.get(code) {
                warn!(code = %code, ?prev, ignored = ?msg, "按键重复绑定，保留先出现的绑定");
                continue;
            }
            map.insert(code.clone(), msg);
        }
        Self { map }
    }

    /// 将原始输入消息转换为语义化输入消息
    ///
    /// 按键代码未映射或为释放事件时返回 `None`
    #[must_use]
    pub fn convert(&self, raw_msg: RawInputMsg) -> Option<InputMsg> {
        match raw_msg {
            RawInputMsg::Key { code, state } => {
                let RawKeyCode(key_str) = code;
                match state {
                    KeyState::Pressed => self.map.get(&key_str).copied(),
                    KeyState::Released => None,
                }
            }
        }
    }

    /// 已绑定的按键数
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// 是否没有任何绑定
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: &str) -> RawInputMsg {
        RawInputMsg::Key {
            code: RawKeyCode(code.into()),
            state: KeyState::Pressed,
        }
    }

    #[test]
    fn test_key_map_conversion() {
        let key_map = KeyMap::new(&Keys::default());

        assert_eq!(key_map.convert(press("KeyA")), Some(InputMsg::KeyDown(Lane::A)));
        assert_eq!(key_map.convert(press("KeyD")), Some(InputMsg::KeyDown(Lane::D)));
        assert_eq!(key_map.convert(press("KeyR")), Some(InputMsg::Restart));
        assert_eq!(key_map.convert(press("Space")), Some(InputMsg::TogglePause));

        // 未映射的按键
        assert_eq!(key_map.convert(press("KeyZ")), None);
    }

    #[test]
    fn test_release_is_ignored() {
        let key_map = KeyMap::new(&Keys::default());
        let msg = RawInputMsg::Key {
            code: RawKeyCode("KeyA".into()),
            state: KeyState::Released,
        };
        assert_eq!(key_map.convert(msg), None);
    }

    #[test]
    fn test_duplicate_binding_keeps_first() {
        let keys = Keys {
            lane_a: "KeyJ".into(),
            lane_d: "KeyK".into(),
            restart: "KeyJ".into(),
            pause: "Space".into(),
        };
        let key_map = KeyMap::new(&keys);
        assert_eq!(key_map.len(), 3);
        assert_eq!(key_map.convert(press("KeyJ")), Some(InputMsg::KeyDown(Lane::A)));
    }
}
