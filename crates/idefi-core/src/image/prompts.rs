//! Prompt text for agent images

use crate::agent::{Role, Tier};

/// Appended to every role prompt for a consistent look
pub const ROLE_PROMPT_SUFFIX: &str = "The agent has a glowing pixel-art pin on their chest \
representing their role in decentralized finance. The overall aesthetic is cute, pixelated, \
and welcoming, with the agent designed to appeal to a wide audience in the decentralized \
finance space.";

/// Per-role description of the robot
pub fn role_description(role: Role) -> &'static str {
    match role {
        Role::Miner => {
            "A cute, pixelated robot DeFi Miner agent with a small mining pick, wearing a tie, \
             designed in a welcoming and friendly style. The robot has large, expressive eyes and \
             a pixel-art look, with simple, blocky arms and legs. The glowing blockchain-based \
             icon pin on the chest represents mining. The background is a pixelated high-tech \
             world, and the Miner robot looks charming with a professional yet approachable \
             appearance."
        }
        Role::Builder => {
            "A cute, pixelated robot DeFi Builder agent holding small construction tools, wearing \
             a tie, and smiling in a welcoming manner. The robot has blocky arms and legs, large \
             eyes, and a glowing pixel-art icon pin for construction on its chest. The robot \
             looks fun and friendly, like a helper in a digital world. The pixelated design gives \
             it a charming, retro feel."
        }
        Role::Defender => {
            "A cute, pixelated robot DeFi Defender agent, holding a tiny shield, wearing a tie, \
             and standing guard in a playful pose. The robot has a glowing security icon pin on \
             its chest and big, friendly eyes. The body is blocky, with pixelated armor, giving \
             off a strong but welcoming vibe. The background shows a pixel-art world full of \
             security symbols."
        }
        Role::Scout => {
            "A cute, pixelated robot DeFi Scout agent with a small magnifying glass, wearing a \
             tie, and exploring a pixelated landscape. The Scout's glowing icon pin represents \
             market analysis, and the robot has large, curious eyes, and a fun, friendly design. \
             The pixelated body gives the robot a charming look, and the background is a \
             retro-style digital landscape."
        }
        Role::Healer => {
            "A cute, pixelated robot DeFi Healer agent holding tiny tools for fixing things, \
             wearing a tie, and giving a friendly wave. The robot has a glowing healing icon pin \
             on its chest, with big eyes and a blocky body. The Healer robot looks like a \
             cheerful, professional helper, ready to repair digital financial assets in a \
             pixel-art world full of balance and harmony."
        }
    }
}

/// Full prompt for a role image
pub fn role_prompt(role: Role) -> String {
    format!("{} {}", role_description(role), ROLE_PROMPT_SUFFIX)
}

/// Prompt for agents created without a role
pub fn tier_prompt(tier: Tier) -> String {
    format!(
        "A futuristic AI agent representing a '{}' role in a sleek, modern design, \
         with a glowing pin representing their role.",
        tier
    )
}
